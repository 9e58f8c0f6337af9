/*!

Logging with a global numeric verbosity threshold layered over the `tracing` ecosystem.

The log level describes what _kind_ of message is logged (`critical!` down to `trace!`), while
the numeric threshold describes its _verbosity_. Individual log entries are logged "at" a given
threshold and are only emitted if that threshold is at most the global threshold. A message with
threshold 0 is always emitted.

```
use telos_abs::{info, log::set_global_logging_threshold};

set_global_logging_threshold(1);
info!(1, "processing started");       // emitted
info!(2, "details nobody asked for"); // not emitted
info!("always emitted");              // threshold defaults to 0
```

The macros attach the threshold as a structured field and initialize the backing subscriber
implicitly; the filtering happens in a subscriber layer, so no explicit setup call is required.

*/

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::Lazy;
use tracing::field::{Field, Visit};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan, Layer, Registry};

static GLOBAL_THRESHOLD: AtomicU8 = AtomicU8::new(0);

/// Sets the global verbosity threshold. Messages logged at a higher threshold are suppressed.
pub fn set_global_logging_threshold(threshold: u8) {
  GLOBAL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_THRESHOLD.load(Ordering::Relaxed)
}

/// A layer that drops every event whose `threshold` field exceeds the global threshold.
struct ThresholdFilterLayer;

#[derive(Default)]
struct ThresholdVisitor {
  threshold: Option<u64>,
}

impl Visit for ThresholdVisitor {
  fn record_u64(&mut self, field: &Field, value: u64) {
    if field.name() == "threshold" {
      self.threshold = Some(value);
    }
  }

  fn record_i64(&mut self, field: &Field, value: i64) {
    if field.name() == "threshold" {
      self.threshold = Some(value.max(0) as u64);
    }
  }

  fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S> Layer<S> for ThresholdFilterLayer
where
  S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
  fn event_enabled(
    &self,
    event: &tracing::Event<'_>,
    _ctx: tracing_subscriber::layer::Context<'_, S>,
  ) -> bool {
    let mut visitor = ThresholdVisitor::default();
    event.record(&mut visitor);
    visitor.threshold.unwrap_or(0) <= get_global_logging_threshold() as u64
  }
}

/// Used for implicit initialization.
static INIT_LOGGER: Lazy<()> = Lazy::new(|| {
  let subscriber = Registry::default().with(ThresholdFilterLayer).with(
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stdout),
  );

  // A default subscriber may already be installed by the host application; in that case ours
  // simply stays unused.
  let _ = tracing::subscriber::set_global_default(subscriber);
});

/// This does not need to be called directly. Initializes the logging system.
pub fn init_logger() {
  Lazy::force(&INIT_LOGGER);
}

// Each level macro has two forms:
//     level!(threshold, "format string", args...);
//     level!("format string", args...);     // threshold 0, always emitted

#[macro_export]
macro_rules! critical {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::ERROR,
                critical = true,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::ERROR,
                critical = true,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! error {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::ERROR,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::ERROR,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! warning {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::WARN,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::WARN,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! info {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::INFO,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::INFO,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::DEBUG,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::DEBUG,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

#[macro_export]
macro_rules! trace {
    ($threshold:expr, $($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::TRACE,
                threshold = $threshold,
                message = format_args!($($arg)+)
            );
        }
    };
    ($($arg:tt)+) => {
        {
            $crate::log::init_logger();
            $crate::tracing::event!(
                $crate::tracing::Level::TRACE,
                threshold = 0,
                message = format_args!($($arg)+)
            );
        }
    };
}

// The following makes the macros importable directly from the `log` module.
pub use crate::{critical, debug, error, info, trace, warning};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_round_trips() {
    let previous = get_global_logging_threshold();
    set_global_logging_threshold(3);
    assert_eq!(get_global_logging_threshold(), 3);
    set_global_logging_threshold(previous);
  }

  #[test]
  fn macros_expand() {
    // Exercise both macro forms; filtering is checked by the subscriber layer.
    crate::info!(200, "suppressed unless the threshold is at least {}", 200);
    crate::warning!("always emitted");
  }
}
