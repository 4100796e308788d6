//! Trace-driven location playback.

use millrace_core::{Args, CapabilitySet, ConfigArg, CoreResult, Duration, Errors, Timestamp};
use millrace_graph::{Element, PortCount, PortSpec, Processing};

#[derive(Debug, Clone, Copy)]
struct Leg {
    interval: f64,
    lat: f64,
    lon: f64,
}

/// Plays back a trace of locations from a file.
///
/// Each line of the trace is `INTERVAL LAT LON`, whitespace separated:
/// move to (LAT, LON), arriving INTERVAL seconds after the move begins.
/// The trace cycles back to its first leg past the end.
pub struct TraceLocation {
    legs: Vec<Leg>,
    next: usize,
}

impl TraceLocation {
    /// An empty trace; `configure` reads the file
    #[must_use]
    pub fn new() -> Self {
        Self {
            legs: Vec::new(),
            next: 0,
        }
    }

    /// The next leg of the trace: its destination and the arrival
    /// deadline, `base` plus the leg's interval. `None` until a trace
    /// has been loaded.
    pub fn advance(&mut self, base: Timestamp) -> Option<(f64, f64, Timestamp)> {
        let leg = *self.legs.get(self.next)?;
        self.next += 1;
        if self.next >= self.legs.len() {
            self.next = 0;
        }
        let target = base.add(Duration::from_nanos((leg.interval * 1e9) as u64));
        Some((leg.lat, leg.lon, target))
    }

    fn parse(contents: &str) -> Result<Vec<Leg>, String> {
        let mut legs = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace().map(str::parse::<f64>);
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(Ok(interval)), Some(Ok(lat)), Some(Ok(lon)), None) => {
                    legs.push(Leg { interval, lat, lon });
                }
                _ => return Err(format!("cannot parse trace line {}", lineno + 1)),
            }
        }
        Ok(legs)
    }
}

impl Default for TraceLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for TraceLocation {
    fn class_name(&self) -> &'static str {
        "TraceLocation"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::fixed(0),
            Processing::Agnostic,
            PortCount::fixed(0),
            Processing::Agnostic,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        let path = args
            .filename("trace file")
            .map_err(|e| errh.error(e.to_string()))?;
        args.finish().map_err(|e| errh.error(e.to_string()))?;

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| errh.error(format!("cannot open {}: {e}", path.display())))?;
        self.legs = Self::parse(&contents).map_err(|e| errh.error(e))?;
        if self.legs.is_empty() {
            return Err(errh.error(format!("no locations in {}", path.display())));
        }
        tracing::info!(legs = self.legs.len(), file = %path.display(), "trace loaded");
        Ok(())
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "loc" => self
                .legs
                .get(self.next)
                .map(|leg| format!("{} {}", leg.lat, leg.lon)),
            _ => None,
        }
    }
}
