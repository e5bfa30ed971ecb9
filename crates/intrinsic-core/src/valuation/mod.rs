//! Valuation Engine: CAPM -> WACC -> DCF -> intrinsic value, plus the
//! sensitivity grid. Every function here is pure.

pub mod company;
pub mod dcf;
pub mod intrinsic;
pub mod sensitivity;
pub mod wacc;

pub use company::{value_company, DiscountRateSource, FcfSource, ValuationOutput};
pub use dcf::{calculate_dcf, dcf_from_snapshot, DcfInput, DcfOutput, ValuationParameters};
pub use intrinsic::{equity_value, intrinsic_value_per_share};
pub use sensitivity::{grid_axis, linspace, sensitivity_grid, SensitivityGrid, SensitivityInput};
pub use wacc::{calculate_wacc, capm, CapmAssumptions, WaccOutput};
