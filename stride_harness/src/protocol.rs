//! Wire format of the sender and receiver agents.
//!
//! Each agent prints one comma-separated line on stdout:
//!
//! ```text
//! sender:   page_size,filename,bit_pattern,num_bits,pages_primed,stride,
//!           open_cycles,open_ns,avg_read_cycles,avg_read_ns,total_cycles,total_ns
//! receiver: filename,page_size,num_bits,stride,cached_count,threshold_cycles,
//!           min_cycles,max_cycles,avg_cycles,avg_ns,total_measurement_cycles,
//!           bit_pattern,cycle_values
//! ```
//!
//! Numeric fields are passed through as text. A short or malformed line
//! degrades to sentinel values instead of failing the transmission.

/// Minimum field count of a sender line.
pub const SEND_MIN_FIELDS: usize = 12;

/// Minimum field count of a receiver line.
pub const RECEIVE_MIN_FIELDS: usize = 13;

const SEND_TOTAL_CYCLES: usize = 10;
const SEND_TOTAL_NS: usize = 11;

const RECV_CACHED_COUNT: usize = 4;
const RECV_MIN_CYCLES: usize = 6;
const RECV_MAX_CYCLES: usize = 7;
const RECV_AVG_CYCLES: usize = 8;
const RECV_PATTERN: usize = 11;
const RECV_CYCLE_VALUES: usize = 12;

/// Timing reported by the sender agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Total priming cycles
    pub cycles: String,
    /// Total priming nanoseconds
    pub nanos: String,
    /// Set when the response was unusable and sentinels were substituted
    pub degraded: bool,
}

impl SendReport {
    /// Sentinel report for an unusable response.
    pub fn degraded() -> Self {
        Self {
            cycles: "0".to_string(),
            nanos: "0".to_string(),
            degraded: true,
        }
    }

    /// Send time in milliseconds, 0 when the nanosecond field is not numeric.
    pub fn millis(&self) -> f64 {
        self.nanos.trim().parse::<f64>().map(|ns| ns / 1_000_000.0).unwrap_or(0.0)
    }
}

/// Bits and timing statistics reported by the receiver agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    /// Recovered bits; all `'?'` when degraded
    pub pattern: String,
    pub cached_count: String,
    pub avg_cycles: String,
    pub min_cycles: String,
    pub max_cycles: String,
    /// Per-page cycle counts, space separated
    pub cycle_values: String,
    /// Set when the response was unusable and sentinels were substituted
    pub degraded: bool,
}

impl ReceiveReport {
    /// Sentinel report: `message_length` unknown bits and zeroed statistics.
    pub fn degraded(message_length: usize) -> Self {
        Self {
            pattern: "?".repeat(message_length),
            cached_count: "0".to_string(),
            avg_cycles: "0".to_string(),
            min_cycles: "0".to_string(),
            max_cycles: "0".to_string(),
            cycle_values: String::new(),
            degraded: true,
        }
    }
}

/// Parses a sender line; fewer than `SEND_MIN_FIELDS` fields degrades.
pub fn parse_send_response(line: &str) -> SendReport {
    let fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() < SEND_MIN_FIELDS {
        return SendReport::degraded();
    }
    SendReport {
        cycles: fields[SEND_TOTAL_CYCLES].to_string(),
        nanos: fields[SEND_TOTAL_NS].to_string(),
        degraded: false,
    }
}

/// Parses a receiver line; fewer than `RECEIVE_MIN_FIELDS` fields degrades.
pub fn parse_receive_response(line: &str, message_length: usize) -> ReceiveReport {
    let fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() < RECEIVE_MIN_FIELDS {
        return ReceiveReport::degraded(message_length);
    }
    ReceiveReport {
        pattern: fields[RECV_PATTERN].to_string(),
        cached_count: fields[RECV_CACHED_COUNT].to_string(),
        avg_cycles: fields[RECV_AVG_CYCLES].to_string(),
        min_cycles: fields[RECV_MIN_CYCLES].to_string(),
        max_cycles: fields[RECV_MAX_CYCLES].to_string(),
        cycle_values: fields[RECV_CYCLE_VALUES].trim().to_string(),
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER_LINE: &str =
        "4096,/workspace/rand0.bin,0101,4,2,32,1200,400,5300,1800,21000,7200\n";
    const RECEIVER_LINE: &str =
        concat!(
            "  /workspace/rand0.bin,4096,4,32,2,100000,310,250000,125155,41000,500620,",
            "0101,250000 310 249990 320 \n",
        );

    #[test]
    fn test_parse_send_response() {
        let report = parse_send_response(SENDER_LINE);
        assert_eq!(report.cycles, "21000");
        assert_eq!(report.nanos, "7200");
        assert!(!report.degraded);
        assert!((report.millis() - 0.0072).abs() < 1e-12);
    }

    #[test]
    fn test_short_send_response_degrades() {
        let report = parse_send_response("4096,/workspace/rand0.bin,0101");
        assert_eq!(report, SendReport::degraded());
        assert_eq!(report.millis(), 0.0);

        assert!(parse_send_response("").degraded);
    }

    #[test]
    fn test_parse_receive_response() {
        let report = parse_receive_response(RECEIVER_LINE, 4);
        assert_eq!(report.pattern, "0101");
        assert_eq!(report.cached_count, "2");
        assert_eq!(report.min_cycles, "310");
        assert_eq!(report.max_cycles, "250000");
        assert_eq!(report.avg_cycles, "125155");
        assert_eq!(report.cycle_values, "250000 310 249990 320");
        assert!(!report.degraded);
    }

    #[test]
    fn test_short_receive_response_degrades() {
        let report = parse_receive_response("a,b,c", 8);
        assert_eq!(report.pattern, "????????");
        assert_eq!(report.cached_count, "0");
        assert_eq!(report.avg_cycles, "0");
        assert_eq!(report.min_cycles, "0");
        assert_eq!(report.max_cycles, "0");
        assert_eq!(report.cycle_values, "");
        assert!(report.degraded);
    }

    #[test]
    fn test_receive_pattern_passed_through_unchecked() {
        // Length mismatches are scored, not rejected, here.
        let line = "f,4096,4,32,0,100000,1,2,3,4,5,01,1 2";
        assert_eq!(parse_receive_response(line, 4).pattern, "01");
    }
}
