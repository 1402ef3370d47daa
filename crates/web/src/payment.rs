use std::str::FromStr;

use storage::models::Analysis;

/// Whether detailed results wait for payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentPolicy {
    #[default]
    Disabled,
    /// Opponent list and percentile are hidden until the analysis is paid.
    RequirePaid,
}

impl PaymentPolicy {
    pub fn withholds(&self, analysis: &Analysis) -> bool {
        matches!(self, Self::RequirePaid) && !analysis.is_paid
    }
}

impl FromStr for PaymentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "require_paid" => Ok(Self::RequirePaid),
            other => Err(format!(
                "expected 'disabled' or 'require_paid', got '{other}'"
            )),
        }
    }
}
