use serde::{Deserialize, Serialize};
use std::fmt;

/// Product type of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "外汇即期")]
    FxSpot,
    #[serde(rename = "外汇远期")]
    FxForward,
    #[serde(rename = "外汇掉期")]
    FxSwap,
    #[serde(rename = "同业拆借")]
    InterbankLending,
    #[serde(rename = "货币市场存款")]
    MoneyMarketDeposit,
    #[serde(rename = "现券买卖")]
    BondTrading,
    #[serde(rename = "买断式回购")]
    BuyoutRepo,
    #[serde(rename = "质押式回购")]
    PledgeRepo,
    #[serde(rename = "单边现金流")]
    UnilateralCashflow,
}

/// Front-office status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "生效")]
    Effective,
    #[serde(rename = "到期")]
    Matured,
    #[serde(rename = "失效")]
    Invalid,
}

/// Back-office processing status of a transaction.
///
/// Declared in processing order; the derived `Ord` follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BackOfficeStatus {
    #[serde(rename = "已证实")]
    Confirmed,
    #[serde(rename = "已清算待发报")]
    SettledPendingReport,
    #[serde(rename = "已发报待接收回执")]
    ReportedPendingReceipt,
    #[serde(rename = "已完成")]
    Completed,
}

impl BackOfficeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "已证实",
            Self::SettledPendingReport => "已清算待发报",
            Self::ReportedPendingReceipt => "已发报待接收回执",
            Self::Completed => "已完成",
        }
    }
}

impl fmt::Display for BackOfficeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementMethod {
    #[serde(rename = "全额")]
    Gross,
    #[serde(rename = "净额")]
    Net,
    #[serde(rename = "集中")]
    Centralized,
    #[serde(rename = "无需")]
    NotRequired,
    #[serde(rename = "我行代理")]
    OurBankAgent,
    #[serde(rename = "他行代理")]
    OtherBankAgent,
}

impl SettlementMethod {
    /// Whether settlement goes out over SWIFT messaging.
    pub fn requires_swift(&self) -> bool {
        matches!(self, Self::Gross | Self::Net | Self::Centralized)
    }
}

/// How a transaction is confirmed with the counterparty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmationType {
    #[serde(rename = "SWIFT")]
    Swift,
    #[serde(rename = "文本")]
    Text,
    #[serde(rename = "无证实")]
    NoConfirmation,
}

/// Upstream system a transaction originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionSource {
    Git,
    Fxo,
    Fxs,
    Fxy,
    Fxw,
}

/// Confirmation matching status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "匹配成功")]
    Matched,
    #[serde(rename = "匹配失败")]
    Unmatched,
    #[serde(rename = "等待匹配")]
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Receive,
    Pay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebitCreditIndicator {
    Debit,
    Credit,
}

/// The four stages a cash flow moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlowStage {
    Netting,
    Compliance,
    Settlement,
    Cancellation,
}

/// Status of a cash flow in the four-stage settlement flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashFlowStatus {
    // Netting
    #[serde(rename = "待轧差")]
    PendingNetting,
    #[serde(rename = "自动轧差完成")]
    AutoNettingComplete,
    #[serde(rename = "手工轧差完成")]
    ManualNettingComplete,
    #[serde(rename = "待发报")]
    PendingDispatch,

    // Compliance
    #[serde(rename = "合规校验中")]
    ComplianceChecking,
    #[serde(rename = "合规通过")]
    ComplianceApproved,
    #[serde(rename = "合规拦截")]
    ComplianceBlocked,
    #[serde(rename = "待审批")]
    PendingApproval,
    #[serde(rename = "审批通过")]
    ApprovalApproved,
    #[serde(rename = "审批拒绝")]
    ApprovalRejected,
    #[serde(rename = "路径已确定")]
    RouteDetermined,

    // Settlement, SWIFT route
    #[serde(rename = "RMC发送中")]
    RmcSending,
    #[serde(rename = "RMC发送成功")]
    RmcSuccess,
    #[serde(rename = "RMC发送失败")]
    RmcFailed,
    #[serde(rename = "FTM发送中")]
    FtmSending,
    #[serde(rename = "FTM发送成功")]
    FtmSuccess,
    #[serde(rename = "FTM发送失败")]
    FtmFailed,

    // Settlement, CBMNet route
    #[serde(rename = "待人工确认")]
    PendingManualConfirm,
    #[serde(rename = "确认通过")]
    ManualConfirmApproved,
    #[serde(rename = "确认拒绝")]
    ManualConfirmRejected,

    // Settlement, core accounting receipt
    #[serde(rename = "核心入账处理中")]
    CoreProcessing,
    #[serde(rename = "结算完成")]
    CoreSuccess,
    #[serde(rename = "入账失败")]
    CoreFailed,
    #[serde(rename = "入账不明")]
    CoreUnknown,

    // Cancellation
    #[serde(rename = "撤销RMC发送中")]
    CancelRmcSending,
    #[serde(rename = "撤销RMC发送失败")]
    CancelRmcFailed,
    #[serde(rename = "撤销FTM发送中")]
    CancelFtmSending,
    #[serde(rename = "撤销FTM发送失败")]
    CancelFtmFailed,
    #[serde(rename = "撤销处理中")]
    CancelProcessing,
    #[serde(rename = "撤销成功")]
    CancelSuccess,
    #[serde(rename = "撤销失败")]
    CancelFailed,
}

impl CashFlowStatus {
    pub fn stage(&self) -> CashFlowStage {
        use CashFlowStatus::*;
        match self {
            PendingNetting | AutoNettingComplete | ManualNettingComplete | PendingDispatch => {
                CashFlowStage::Netting
            }
            ComplianceChecking | ComplianceApproved | ComplianceBlocked | PendingApproval
            | ApprovalApproved | ApprovalRejected | RouteDetermined => CashFlowStage::Compliance,
            RmcSending | RmcSuccess | RmcFailed | FtmSending | FtmSuccess | FtmFailed
            | PendingManualConfirm | ManualConfirmApproved | ManualConfirmRejected
            | CoreProcessing | CoreSuccess | CoreFailed | CoreUnknown => CashFlowStage::Settlement,
            CancelRmcSending | CancelRmcFailed | CancelFtmSending | CancelFtmFailed
            | CancelProcessing | CancelSuccess | CancelFailed => CashFlowStage::Cancellation,
        }
    }

    /// Statuses that stop the flow until someone intervenes.
    pub fn is_failure(&self) -> bool {
        use CashFlowStatus::*;
        matches!(
            self,
            ComplianceBlocked
                | ApprovalRejected
                | RmcFailed
                | FtmFailed
                | ManualConfirmRejected
                | CoreFailed
                | CancelRmcFailed
                | CancelFtmFailed
                | CancelFailed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CoreSuccess | Self::CancelSuccess)
    }
}
