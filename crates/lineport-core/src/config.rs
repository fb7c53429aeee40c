use std::time::Duration;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

/// Everything needed to open a channel on a serial device.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Read timeout of the background reader. Also bounds how long `close` waits.
    pub poll_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ChannelConfig {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The poll interval actually used by the reader, never below 1 ms.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_9600_8n1() {
        let cfg = ChannelConfig::new("/dev/ttyUSB0", 9600);
        assert_eq!(cfg.port_name, "/dev/ttyUSB0");
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.flow_control, FlowControl::None);
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn setters_chain() {
        let cfg = ChannelConfig::new("COM3", 115_200)
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .poll_interval(Duration::from_millis(10));
        assert_eq!(cfg.baud_rate, 115_200);
        assert_eq!(cfg.parity, Parity::Even);
        assert_eq!(cfg.stop_bits, StopBits::Two);
        assert_eq!(cfg.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let cfg = ChannelConfig::new("COM3", 9600).poll_interval(Duration::ZERO);
        assert_eq!(cfg.effective_poll_interval(), Duration::from_millis(1));

        let cfg = ChannelConfig::new("COM3", 9600).poll_interval(Duration::from_millis(20));
        assert_eq!(cfg.effective_poll_interval(), Duration::from_millis(20));
    }
}
