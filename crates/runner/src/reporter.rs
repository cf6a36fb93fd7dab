//! Output sinks for the train/predict loop.

use tickcast_core::Forecast;

/// Receives the loop's user-facing output.
pub trait Reporter {
    /// Not enough prices buffered yet.
    fn waiting(&mut self, remaining: usize);

    /// A cycle produced a forecast.
    fn forecast(&mut self, forecast: &Forecast);
}

/// Line for a waiting notice.
pub fn waiting_line(remaining: usize) -> String {
    format!("Prices left to load: {}", remaining)
}

/// Prints to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn waiting(&mut self, remaining: usize) {
        println!("{}", waiting_line(remaining));
    }

    fn forecast(&mut self, forecast: &Forecast) {
        println!("{}", forecast);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    lines: Vec<String>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported so far, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Reporter for MemoryReporter {
    fn waiting(&mut self, remaining: usize) {
        self.lines.push(waiting_line(remaining));
    }

    fn forecast(&mut self, forecast: &Forecast) {
        self.lines.push(forecast.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tickcast_core::Direction;

    #[test]
    fn test_memory_reporter_lines() {
        let mut reporter = MemoryReporter::new();
        reporter.waiting(12);
        reporter.forecast(&Forecast {
            direction: Direction::Long,
            probability: 0.625,
            training_rows: 40,
            as_of: Utc::now(),
        });

        assert_eq!(
            reporter.lines(),
            &["Prices left to load: 12", "The chance of a Long working is 0.625"]
        );
    }
}
