// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::flexi_logger::{
    DeferredNow,
    Logger,
    LoggerHandle,
};
use ::log::Record;
use ::std::{
    env,
    io::{
        self,
        Write,
    },
    mem,
    sync::Once,
};

//==============================================================================
// Constants
//==============================================================================

/// Log target of telemetry lines. Records under this target are written verbatim.
pub const TELEMETRY_TARGET: &str = "telemetry";

/// Log specification used when `RUST_LOG` is not set.
const DEFAULT_LOG_SPEC: &str = "info";

/// Environment variable holding the log specification.
const LOG_SPEC_ENV: &str = "RUST_LOG";

//==============================================================================
// Static Variables
//==============================================================================

/// Guardian to the logging initialize function.
static INIT_LOG: Once = Once::new();

//==============================================================================
// Standalone Functions
//==============================================================================

/// Initializes logging features.
pub fn initialize() {
    INIT_LOG.call_once(|| {
        let spec: String = log_spec(env::var(LOG_SPEC_ENV).ok().as_deref());
        let logger: Logger = match Logger::try_with_str(&spec) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("initialize(): invalid log specification ({:?})", e);
                return;
            },
        };
        match logger.format(format_record).log_to_stderr().start() {
            // The logger must outlive every caller, so the handle is never dropped.
            Ok(handle) => mem::forget::<LoggerHandle>(handle),
            Err(e) => eprintln!("initialize(): failed to start logger ({:?})", e),
        }
    });
}

/// Builds the log specification from `base`. Telemetry lines are emitted at info level whatever the base level is,
/// unless `base` filters the telemetry target itself.
fn log_spec(base: Option<&str>) -> String {
    let base: &str = match base.map(str::trim) {
        Some(base) if !base.is_empty() => base,
        _ => DEFAULT_LOG_SPEC,
    };
    let has_telemetry_filter: bool = base
        .split(',')
        .any(|directive| directive.trim().split('=').next() == Some(TELEMETRY_TARGET));
    if has_telemetry_filter {
        base.to_string()
    } else {
        format!("{}, {}=info", base, TELEMETRY_TARGET)
    }
}

/// Formats a single log record.
fn format_record(w: &mut dyn Write, _now: &mut DeferredNow, record: &Record) -> io::Result<()> {
    if record.target() == TELEMETRY_TARGET {
        write!(w, "{}", record.args())
    } else {
        write!(
            w,
            "{} [{}] {}",
            record.level(),
            record.module_path().unwrap_or("<unnamed>"),
            record.args()
        )
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
