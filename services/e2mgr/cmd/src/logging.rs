use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::IsTerminal;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_CYAN: &str = "\x1b[36m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_BRIGHT_YELLOW: &str = "\x1b[93m";
const COLOR_BRIGHT_RED: &str = "\x1b[91m";
const COLOR_BRIGHT_GRAY: &str = "\x1b[90m";

const COMPONENT_WIDTH: usize = 12;

/// Output shape of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Aligned, optionally colored line for operators at a terminal
    #[default]
    Console,
    /// One JSON record per line: `ts`, `crit`, `id`, `mdc`, `msg`
    Mdc,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "mdc" | "json" => Ok(Self::Mdc),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Log at info level on behalf of a component
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log at warn level on behalf of a component
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log at error level on behalf of a component
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(component = $component, $($arg)*)
    };
}

/// Event formatter for the E2 manager.
///
/// Every field besides `message` lands in the diagnostic context: a trailing
/// `{k=v}` block on the console, the `mdc` object in a record.
pub struct E2mgrLogFormatter {
    id: String,
    format: LogFormat,
    color_enabled: bool,
}

impl E2mgrLogFormatter {
    pub fn new(id: impl Into<String>, format: LogFormat) -> Self {
        Self {
            id: id.into(),
            format,
            color_enabled: format == LogFormat::Console && std::io::stdout().is_terminal(),
        }
    }

    fn crit(level: &Level) -> &'static str {
        match *level {
            Level::ERROR => "ERROR",
            Level::WARN => "WARN",
            Level::INFO => "INFO",
            Level::DEBUG | Level::TRACE => "DEBUG",
        }
    }

    fn color(&self, level: &Level) -> &'static str {
        if !self.color_enabled {
            return "";
        }
        match *level {
            Level::ERROR => COLOR_BRIGHT_RED,
            Level::WARN => COLOR_BRIGHT_YELLOW,
            Level::INFO => COLOR_GREEN,
            Level::DEBUG | Level::TRACE => COLOR_BRIGHT_GRAY,
        }
    }

    fn console_line(&self, level: &Level, fields: &EventFields) -> String {
        let (cyan, reset) = if self.color_enabled {
            (COLOR_CYAN, COLOR_RESET)
        } else {
            ("", "")
        };
        let component = fields.context.get("component").map_or("-", String::as_str);
        let mut line = format!(
            "{}[{}]{} {}{:<5}{} [{:<width$}] {}",
            cyan,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            reset,
            self.color(level),
            Self::crit(level),
            reset,
            component,
            fields.message,
            width = COMPONENT_WIDTH
        );

        let context: Vec<String> = fields
            .context
            .iter()
            .filter(|(key, _)| key.as_str() != "component")
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        if !context.is_empty() {
            line.push_str(&format!(" {{{}}}", context.join(", ")));
        }
        line
    }

    fn mdc_record(&self, ts_millis: i64, level: &Level, fields: EventFields) -> String {
        let record = MdcRecord {
            ts: ts_millis,
            crit: Self::crit(level),
            id: &self.id,
            mdc: fields.context,
            msg: fields.message,
        };
        // Only string maps and scalars go in, so this cannot fail.
        serde_json::to_string(&record).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct MdcRecord<'a> {
    ts: i64,
    crit: &'static str,
    id: &'a str,
    mdc: BTreeMap<String, String>,
    msg: String,
}

impl<S, N> FormatEvent<S, N> for E2mgrLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let line = match self.format {
            LogFormat::Console => self.console_line(level, &fields),
            LogFormat::Mdc => self.mdc_record(chrono::Utc::now().timestamp_millis(), level, fields),
        };
        writeln!(writer, "{}", line)
    }
}

/// The message of an event and everything recorded alongside it
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    context: BTreeMap<String, String>,
}

impl EventFields {
    fn record(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else {
            self.context.insert(name.to_string(), value);
        }
    }
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        self.record(field.name(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record(field.name(), value.to_string());
    }
}
