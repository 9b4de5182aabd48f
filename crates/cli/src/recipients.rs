//! Loading recipient rows from a file and from `--to` flags.
//!
//! ```toml
//! [[recipients]]
//! address = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb"
//! amount = "12.5"
//! memo = "March invoice"
//! ```

use anyhow::{anyhow, Context, Result};
use batchpay_types::RecipientSession;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipientsFile {
    #[serde(default)]
    recipients: Vec<RecipientRow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipientRow {
    #[serde(default)]
    address: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    memo: String,
}

/// Append every row of a recipients file to `session`, in file order.
pub fn load_file(session: &mut RecipientSession, path: &Path) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read recipients file: {}", path.display()))?;
    load_str(session, &contents)
        .with_context(|| format!("Failed to parse recipients file: {}", path.display()))
}

pub fn load_str(session: &mut RecipientSession, contents: &str) -> Result<()> {
    let file: RecipientsFile = toml::from_str(contents)?;
    for row in file.recipients {
        let id = session.push(row.address, row.amount);
        if !row.memo.is_empty() {
            session.update_memo(id, row.memo);
        }
    }
    Ok(())
}

/// Parse an `ADDRESS=AMOUNT` flag value.
///
/// Only the shape is checked here; the engine validates both halves.
pub fn parse_pair(pair: &str) -> Result<(String, String)> {
    let (address, amount) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected ADDRESS=AMOUNT, got {:?}", pair))?;
    Ok((address.trim().to_string(), amount.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb";

    #[test]
    fn test_load_str_keeps_file_order() {
        let mut session = RecipientSession::new();
        load_str(
            &mut session,
            &format!(
                r#"
                [[recipients]]
                address = "{ADDR}"
                amount = "1"
                memo = "first"

                [[recipients]]
                address = "{ADDR}"
                amount = "2.5"
                "#
            ),
        )
        .unwrap();

        let rows = session.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].memo, "first");
        assert_eq!(rows[1].amount, "2.5");
        assert_eq!(session.summary().total, "3.5");
    }

    #[test]
    fn test_empty_file_keeps_blank_row() {
        let mut session = RecipientSession::new();
        load_str(&mut session, "").unwrap();
        assert_eq!(session.rows().len(), 1);
        assert!(session.rows()[0].is_blank());
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair(&format!("{ADDR}=1.5")).unwrap(),
            (ADDR.to_string(), "1.5".to_string())
        );
        assert!(parse_pair(ADDR).is_err());
    }
}
