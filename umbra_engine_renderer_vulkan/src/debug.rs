/// Vulkan Debug Messenger - routes validation layer messages to the engine log
///
/// Only compiled with the `vulkan-validation` feature. Messages are counted
/// per severity and identical messages are grouped, so a report can be
/// printed at shutdown.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use umbra_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::vulkan_config::DebugSeverity;

const SOURCE: &str = "umbra::vulkan::validation";

/// Active severity filter, `None` until a device enables validation
static DEBUG_SEVERITY: Mutex<Option<DebugSeverity>> = Mutex::new(None);

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrence count per message text
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts since the device was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn record(&self, level: MessageLevel) {
        let counter = match level {
            MessageLevel::Error => &self.errors,
            MessageLevel::Warning => &self.warnings,
            MessageLevel::Info => &self.info,
            MessageLevel::Verbose => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    pub(crate) fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            MessageLevel::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }
}

/// Whether a message of `level` passes `filter`
pub(crate) fn passes_filter(filter: DebugSeverity, level: MessageLevel) -> bool {
    match filter {
        DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
        DebugSeverity::ErrorsAndWarnings => matches!(level, MessageLevel::Error | MessageLevel::Warning),
        DebugSeverity::All => true,
    }
}

pub(crate) fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Install the severity filter and reset statistics
pub fn init_debug_config(severity: DebugSeverity) {
    VALIDATION_STATS.reset();
    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }
    if let Ok(mut config) = DEBUG_SEVERITY.lock() {
        *config = Some(severity);
    }
}

/// Stop forwarding messages. Called when the device is torn down.
pub fn cleanup_debug_config() {
    if let Ok(mut config) = DEBUG_SEVERITY.lock() {
        *config = None;
    }
}

pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print a colored summary of validation messages to stdout
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(tracker) = MESSAGE_TRACKER.lock() {
        let repeated = tracker
            .as_ref()
            .map_or(0, |messages| messages.values().filter(|&&count| count > 1).count());
        if repeated > 0 {
            println!("\n  {} message(s) appeared multiple times", repeated);
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

fn track_message(message: &str) -> u32 {
    match MESSAGE_TRACKER.lock() {
        Ok(mut tracker) => {
            let count = tracker
                .get_or_insert_with(FxHashMap::default)
                .entry(message.to_string())
                .or_insert(0);
            *count += 1;
            *count
        }
        Err(_) => 1,
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Vulkan debug messenger callback
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let filter = match DEBUG_SEVERITY.lock() {
        Ok(config) => match *config {
            Some(filter) => filter,
            None => return vk::FALSE,
        },
        Err(_) => return vk::FALSE,
    };

    let level = MessageLevel::from_vk(message_severity);
    if !passes_filter(filter, level) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = &*p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    VALIDATION_STATS.record(level);
    let occurrences = track_message(&message);
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };

    let type_name = message_type_name(message_type);
    match level {
        MessageLevel::Error => engine_error!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id_name, message),
        MessageLevel::Warning => engine_warn!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id_name, message),
        MessageLevel::Info => engine_info!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id_name, message),
        MessageLevel::Verbose => engine_debug!(SOURCE, "[{}]{} {}: {}", type_name, repeat, message_id_name, message),
    }

    vk::FALSE
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
