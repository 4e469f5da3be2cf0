//! Closed label sets used by expenses, incomes and goals.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Raised when a label falls outside one of the closed sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: `{}`", self.kind, self.value)
    }
}

impl std::error::Error for ParseLabelError {}

macro_rules! closed_label_set {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ParseLabelError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let wanted = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.label().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseLabelError {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }
    };
}

closed_label_set! {
    /// Spending categories; each one can carry a monthly budget.
    ExpenseCategory, "expense category" {
        Food => "Food",
        Transport => "Transport",
        Entertainment => "Entertainment",
        Bills => "Bills",
        Healthcare => "Healthcare",
        Shopping => "Shopping",
        Other => "Other",
    }
}

closed_label_set! {
    PaymentMethod, "payment method" {
        Bank => "Bank",
        Cash => "Cash",
        CreditCard => "Credit Card",
    }
}

closed_label_set! {
    IncomeSource, "income source" {
        Salary => "Salary",
        Freelance => "Freelance",
        Investments => "Investments",
        Other => "Other",
    }
}

closed_label_set! {
    GoalCategory, "goal category" {
        Vacation => "Vacation",
        EmergencyFund => "Emergency Fund",
        Education => "Education",
        Home => "Home",
        Vehicle => "Vehicle",
        Other => "Other",
    }
}
