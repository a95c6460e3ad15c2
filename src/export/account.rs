use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    sync::LazyLock,
};

use chrono::NaiveDate;
use regex::Regex;

use crate::{
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Five-digit US postal code, the one the weather lookup needs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PostalCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ensure!(
            s.len() == 5 && s.bytes().all(|byte| byte.is_ascii_digit()),
            "`{s}` is not a 5-digit postal code",
        );
        Ok(Self(s.to_owned()))
    }
}

impl Display for PostalCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trailing `ZIP5`, `ZIP5-4` or nine contiguous digits of a service address.
static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})(?:-?(\d{4}))?\s*$").unwrap());

/// Account details from the export preamble.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub name: Option<String>,
    pub address: Option<String>,
    pub account_number: Option<String>,
    pub service: Option<String>,
    pub postal_code: Option<PostalCode>,

    /// The `+4` part, informational only.
    pub postal_code_extension: Option<String>,
}

impl Account {
    /// Collect the `key, value` rows preceding the header. Unknown keys are ignored.
    pub fn from_preamble<K: AsRef<str>>(rows: impl IntoIterator<Item = (K, String)>) -> Self {
        let mut account = Self::default();
        for (key, value) in rows {
            if value.is_empty() {
                continue;
            }
            match key.as_ref().trim_end_matches(':') {
                "Name" => account.name = Some(value),
                "Address" => {
                    if let Some(captures) = POSTAL_CODE.captures(&value) {
                        account.postal_code = Some(PostalCode(captures[1].to_owned()));
                        account.postal_code_extension =
                            captures.get(2).map(|extension| extension.as_str().to_owned());
                    }
                    account.address = Some(value);
                }
                "Account Number" => account.account_number = Some(value),
                "Service" => account.service = Some(value),
                _ => {}
            }
        }
        account
    }
}

/// Line of the billing-summary section. It never feeds the interval series.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub usage: KilowattHours,
    pub cost: Option<Cost>,
}
