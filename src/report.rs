use alloy::primitives::TxHash;
use std::fmt::Display;
use std::io::{self, Stderr, Stdout, Write};

/// Human-readable result lines on one writer, error lines on another.
///
/// Write failures are dropped: once the terminal is gone there is nobody
/// left to tell.
pub struct Reporter<O, E> {
    out: O,
    err: E,
}

impl Reporter<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn result(&mut self, rendered: &str) {
        let _ = writeln!(self.out, "📦 Result: {}", rendered);
    }

    pub fn gas_estimate(&mut self, gas: u64) {
        let _ = writeln!(self.out, "⛽ Gas estimate: {}", gas);
    }

    pub fn tx_sent(&mut self, tx_hash: &TxHash) {
        let _ = writeln!(self.out, "🚀 TX sent: {}", tx_hash);
        // The confirmation wait can be long; show the hash now.
        let _ = self.out.flush();
    }

    pub fn tx_confirmed(&mut self, block_number: u64) {
        let _ = writeln!(self.out, "✅ TX confirmed in block {}", block_number);
    }

    pub fn error(&mut self, error: &dyn Display) {
        let _ = writeln!(self.err, "❌ Error: {}", error);
    }

    #[cfg(test)]
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_go_to_the_right_writer() {
        let mut reporter = Reporter::new(Vec::new(), Vec::new());
        reporter.result("42");
        reporter.gas_estimate(21000);
        reporter.error(&"boom");

        let (out, err) = reporter.into_inner();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "📦 Result: 42\n⛽ Gas estimate: 21000\n"
        );
        assert_eq!(String::from_utf8(err).unwrap(), "❌ Error: boom\n");
    }

    #[test]
    fn test_transaction_lines() {
        let mut reporter = Reporter::new(Vec::new(), Vec::new());
        reporter.tx_sent(&TxHash::repeat_byte(0xab));
        reporter.tx_confirmed(19_000_000);

        let (out, _) = reporter.into_inner();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("🚀 TX sent: 0x{}", "ab".repeat(32)));
        assert_eq!(lines[1], "✅ TX confirmed in block 19000000");
    }
}
