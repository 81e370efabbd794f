use crate::de::{de_int_as_bool, de_str_or_f64};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Account the socket is authorized for, captured from the `authorize` reply.
///
/// ### Raw Payload Examples
/// ```json
/// {
///     "loginid": "CR123",
///     "currency": "USD",
///     "is_virtual": 1,
///     "landing_company_name": "svg",
///     "balance": 10000,
///     "email": "trader@example.com",
///     "fullname": " Jane Doe"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct AccountContext {
    #[serde(rename = "loginid")]
    pub login_id: SmolStr,

    #[serde(default)]
    pub currency: SmolStr,

    #[serde(deserialize_with = "de_int_as_bool")]
    pub is_virtual: bool,

    #[serde(rename = "landing_company_name", default)]
    pub landing_company: SmolStr,

    /// Balance reported alongside the authorization, if any.
    #[serde(default)]
    pub balance: Option<f64>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub fullname: Option<String>,
}

/// Account balance from a snapshot reply or a balance stream push.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct AccountBalance {
    #[serde(deserialize_with = "de_str_or_f64")]
    pub balance: f64,

    pub currency: SmolStr,

    #[serde(rename = "loginid", default)]
    pub login_id: Option<SmolStr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_account_context() {
        let input = r#"
            {
                "loginid": "VRTC42",
                "currency": "USD",
                "is_virtual": 1,
                "landing_company_name": "virtual",
                "balance": 10000,
                "email": "trader@example.com",
                "scopes": ["read", "trade"]
            }
        "#;

        let actual = serde_json::from_str::<AccountContext>(input).unwrap();
        assert_eq!(
            actual,
            AccountContext {
                login_id: SmolStr::new("VRTC42"),
                currency: SmolStr::new("USD"),
                is_virtual: true,
                landing_company: SmolStr::new("virtual"),
                balance: Some(10000.0),
                email: Some("trader@example.com".to_string()),
                fullname: None,
            }
        );
    }

    #[test]
    fn test_de_account_balance() {
        struct TestCase {
            input: &'static str,
            expected: Option<AccountBalance>,
        }

        let tests = vec![
            TestCase {
                // TC0: numeric balance
                input: r#"{"balance": 9990.5, "currency": "USD", "loginid": "CR123"}"#,
                expected: Some(AccountBalance {
                    balance: 9990.5,
                    currency: SmolStr::new("USD"),
                    login_id: Some(SmolStr::new("CR123")),
                }),
            },
            TestCase {
                // TC1: string balance without loginid
                input: r#"{"balance": "12.00", "currency": "EUR"}"#,
                expected: Some(AccountBalance {
                    balance: 12.0,
                    currency: SmolStr::new("EUR"),
                    login_id: None,
                }),
            },
            TestCase {
                // TC2: missing currency is rejected
                input: r#"{"balance": 1}"#,
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<AccountBalance>(test.input).ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
