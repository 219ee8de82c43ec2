//! Best-effort operator notifications.
//!
//! Delivery is fire-and-forget: `dispatch` spawns the send and only logs a
//! failure, so a slow or broken webhook never affects a bridge response.

pub mod webhook;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use relay_types::Result;
use tracing::warn;

pub use webhook::WebhookNotifier;

/// Format `value` smallest units as a decimal with `decimals` places,
/// trailing zeros trimmed ("1.0", "0.018").
pub fn format_units(value: U256, decimals: u8) -> String {
    let base = U256::from(10u64).pow(U256::from(decimals));
    let (whole, frac) = value.div_rem(base);
    if decimals == 0 {
        return format!("{}.0", whole);
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Outcome summary sent to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Completed {
        user: Address,
        from: String,
        to: String,
        amount: U256,
        decimals: u8,
        source_tx_hash: Option<TxHash>,
        relayer_tx_hash: TxHash,
    },
    Failed {
        user: Option<Address>,
        from: String,
        to: String,
        amount: U256,
        decimals: u8,
        error: String,
    },
}

impl Notification {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { user, from, to, amount, decimals, source_tx_hash, relayer_tx_hash } => {
                writeln!(f, "Bridge Completed")?;
                writeln!(f, "User: {}", user)?;
                writeln!(f, "From: {}", from)?;
                writeln!(f, "To: {}", to)?;
                writeln!(f, "Amount: {}", format_units(*amount, *decimals))?;
                match source_tx_hash {
                    Some(hash) => writeln!(f, "Source TxHash: {}", hash)?,
                    None => writeln!(f, "Source TxHash: -")?,
                }
                write!(f, "Relayer TX: {}", relayer_tx_hash)
            }
            Self::Failed { user, from, to, amount, decimals, error } => {
                writeln!(f, "Bridge Error")?;
                match user {
                    Some(user) => writeln!(f, "User: {}", user)?,
                    None => writeln!(f, "User: ")?,
                }
                writeln!(f, "From: {}", from)?;
                writeln!(f, "To: {}", to)?;
                writeln!(f, "Amount: {}", format_units(*amount, *decimals))?;
                write!(f, "Error: {}", error)
            }
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}

/// Deliver in the background; failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            warn!(error = %e, "notification delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(ether(1), 18), "1.0");
        assert_eq!(format_units(U256::from(18_000_000_000_000_000u64), 18), "0.018");
        assert_eq!(format_units(U256::ZERO, 18), "0.0");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(42u64), 0), "42.0");
    }

    #[test]
    fn test_completed_text() {
        let text = Notification::Completed {
            user: Address::repeat_byte(0x11),
            from: "ETH".into(),
            to: "PGirls".into(),
            amount: ether(2),
            decimals: 18,
            source_tx_hash: None,
            relayer_tx_hash: TxHash::repeat_byte(0x22),
        }
        .to_string();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Bridge Completed");
        assert_eq!(lines[2], "From: ETH");
        assert_eq!(lines[3], "To: PGirls");
        assert_eq!(lines[4], "Amount: 2.0");
        assert_eq!(lines[5], "Source TxHash: -");
        assert!(lines[6].starts_with("Relayer TX: 0x2222"));
    }

    #[test]
    fn test_failed_text() {
        let notification = Notification::Failed {
            user: None,
            from: "PGirls".into(),
            to: "ETH".into(),
            amount: U256::ZERO,
            decimals: 18,
            error: "insufficient reserves".into(),
        };
        assert!(notification.is_failure());
        let text = notification.to_string();
        assert!(text.starts_with("Bridge Error\nUser: \n"));
        assert!(text.ends_with("Error: insufficient reserves"));
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        let notification = Notification::Failed {
            user: None,
            from: "A".into(),
            to: "B".into(),
            amount: U256::ZERO,
            decimals: 18,
            error: "x".into(),
        };
        NoopNotifier.notify(&notification).await.unwrap();
    }
}
