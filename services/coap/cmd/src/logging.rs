use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// ANSI color codes for console output
const COLOR_RESET: &str = "\x1b[0m";
const COLOR_CYAN: &str = "\x1b[36m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_BRIGHT_YELLOW: &str = "\x1b[93m";
const COLOR_BRIGHT_RED: &str = "\x1b[91m";
const COLOR_BRIGHT_GRAY: &str = "\x1b[90m";

/// Column widths for aligned output
const SERVICE_NAME_WIDTH: usize = 16;
const LOG_LEVEL_WIDTH: usize = 7;

/// Line formatter: `[timestamp] [service] [level] message`
pub struct CoapLogFormatter {
    service_name: String,
    color_enabled: bool,
}

/// Log at info level with a `component` field
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(component = $component, $($arg)*)
    };
}

/// Log at warn level with a `component` field
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(component = $component, $($arg)*)
    };
}

/// Log at debug level with a `component` field
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(component = $component, $($arg)*)
    };
}

impl CoapLogFormatter {
    pub fn new(service_name: String) -> Self {
        let color_enabled = is_terminal();
        Self {
            service_name,
            color_enabled,
        }
    }

    #[cfg(test)]
    fn with_color(mut self, enabled: bool) -> Self {
        self.color_enabled = enabled;
        self
    }

    /// Fixed-width service column; a component renders as `coap-<component>`
    fn format_service_name(&self, component: Option<&str>) -> String {
        let name = match component {
            Some(comp) => format!("coap-{}", comp),
            None => self.service_name.clone(),
        };

        if name.chars().count() > SERVICE_NAME_WIDTH {
            let truncated: String = name.chars().take(SERVICE_NAME_WIDTH - 1).collect();
            format!("{}…", truncated)
        } else {
            format!("{:<width$}", name, width = SERVICE_NAME_WIDTH)
        }
    }

    fn format_log_level(&self, level: &tracing::Level) -> String {
        let level_str = match *level {
            tracing::Level::ERROR => "✗ ERROR",
            tracing::Level::WARN => "⚠ WARN",
            tracing::Level::INFO => "ℹ INFO",
            tracing::Level::DEBUG => "◦ DEBUG",
            tracing::Level::TRACE => "◦ TRACE",
        };

        format!("{:<width$}", level_str, width = LOG_LEVEL_WIDTH + 2)
    }

    fn get_color_for_level(&self, level: &tracing::Level) -> &'static str {
        if !self.color_enabled {
            return "";
        }

        match *level {
            tracing::Level::ERROR => COLOR_BRIGHT_RED,
            tracing::Level::WARN => COLOR_BRIGHT_YELLOW,
            tracing::Level::INFO => COLOR_GREEN,
            tracing::Level::DEBUG | tracing::Level::TRACE => COLOR_BRIGHT_GRAY,
        }
    }

    /// Render one line from already extracted parts
    fn render_line(&self, timestamp: &str, level: &tracing::Level, visitor: &FieldVisitor) -> String {
        let formatted_service = self.format_service_name(visitor.component.as_deref());
        let formatted_level = self.format_log_level(level);

        let color = self.get_color_for_level(level);
        let reset_color = if self.color_enabled { COLOR_RESET } else { "" };
        let cyan_color = if self.color_enabled { COLOR_CYAN } else { "" };

        let mut line = format!(
            "{}[{}] [{}] [{}{}{}] {}",
            cyan_color,
            timestamp,
            formatted_service,
            color,
            formatted_level,
            reset_color,
            visitor.message
        );
        for (key, value) in &visitor.fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        line.push_str(reset_color);
        line
    }
}

impl<S, N> FormatEvent<S, N> for CoapLogFormatter
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
        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string();

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        writeln!(
            writer,
            "{}",
            self.render_line(&timestamp, event.metadata().level(), &visitor)
        )
    }
}

/// Visitor to extract fields from the event
struct FieldVisitor {
    message: String,
    component: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
            component: None,
            fields: Vec::new(),
        }
    }
}

fn strip_quotes(s: String) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        let rendered = strip_quotes(format!("{:?}", value));
        match field.name() {
            "message" => self.message = rendered,
            "component" => self.component = Some(rendered),
            name => self.fields.push((name, rendered)),
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            name => self.fields.push((name, value.to_string())),
        }
    }
}

/// Check if we're outputting to a terminal (for color support)
fn is_terminal() -> bool {
    match std::env::var("TERM") {
        Ok(term) => term != "dumb",
        Err(_) => false,
    }
}
