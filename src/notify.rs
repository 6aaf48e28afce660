//! # Notification / Activity Interface
//!
//! Grounded on `original_source/src/activity.cpp`: the original reports
//! progress and XDS events to a GUI front-end through a family of
//! `activity_*` free functions gated on `ccx_options.gui_mode_reports`.
//! This crate replaces that global-function surface with an object-safe
//! `Notifier` trait the pipeline holds as `Box<dyn Notifier>`, with a
//! default no-op implementation and a `LogNotifier` that forwards
//! everything to the `log` crate for the common CLI case.

/// Receives progress and XDS-derived activity events from the pipeline.
///
/// Every method has a default no-op body so callers only need to
/// implement the events they care about.
pub trait Notifier: Send {
    /// Overall progress, 0..=100, or `None` in streaming/live mode where
    /// a percentage can't be computed.
    fn progress(&mut self, percent: Option<u8>, cur_min: u32, cur_sec: u32) {
        let _ = (percent, cur_min, cur_sec);
    }

    /// An input file was opened (relevant in binary-concat mode, where
    /// several files are opened over one run).
    fn input_file_open(&mut self, filename: &str) {
        let _ = filename;
    }

    /// XDS Program Identification Number (start time) was decoded.
    fn xds_program_identification_number(&mut self, minutes: u32, hours: u32, date: u32, month: u32) {
        let _ = (minutes, hours, date, month);
    }

    /// XDS network call letters changed.
    fn xds_network_call_letters(&mut self, call_letters: &str) {
        let _ = call_letters;
    }

    /// XDS program name changed.
    fn xds_program_name(&mut self, name: &str) {
        let _ = name;
    }

    /// A line of XDS program description was decoded.
    fn xds_program_description(&mut self, line_num: u8, text: &str) {
        let _ = (line_num, text);
    }

    /// Video stream parameters were recognized (from a sequence header or
    /// SPS).
    fn video_info(&mut self, width: u32, height: u32, aspect_ratio: &str, frame_rate: &str) {
        let _ = (width, height, aspect_ratio, frame_rate);
    }

    /// A plain diagnostic message at the given `log` level.
    fn message(&mut self, level: log::Level, text: &str) {
        log::log!(level, "{}", text);
    }
}

/// A `Notifier` that does nothing. Used when the caller doesn't need
/// activity callbacks at all.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}

/// A `Notifier` that forwards every event to the `log` crate at an
/// appropriate level, for the common case of a CLI run with no GUI
/// attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn progress(&mut self, percent: Option<u8>, cur_min: u32, cur_sec: u32) {
        match percent {
            Some(p) => log::info!("progress: {}% ({:02}:{:02})", p, cur_min, cur_sec),
            None => log::info!("streaming ({:02}:{:02})", cur_min, cur_sec),
        }
    }

    fn input_file_open(&mut self, filename: &str) {
        log::info!("opened input file: {}", filename);
    }

    fn xds_program_identification_number(&mut self, minutes: u32, hours: u32, date: u32, month: u32) {
        log::debug!(
            "XDS program identification number: {:02}/{:02} {:02}:{:02}",
            month,
            date,
            hours,
            minutes
        );
    }

    fn xds_network_call_letters(&mut self, call_letters: &str) {
        log::info!("XDS network call letters: {}", call_letters);
    }

    fn xds_program_name(&mut self, name: &str) {
        log::info!("XDS program name: {}", name);
    }

    fn xds_program_description(&mut self, line_num: u8, text: &str) {
        log::debug!("XDS program description line {}: {}", line_num, text);
    }

    fn video_info(&mut self, width: u32, height: u32, aspect_ratio: &str, frame_rate: &str) {
        log::info!(
            "video: {}x{} aspect={} fps={}",
            width,
            height,
            aspect_ratio,
            frame_rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        program_names: Vec<String>,
    }

    impl Notifier for RecordingNotifier {
        fn xds_program_name(&mut self, name: &str) {
            self.program_names.push(name.to_string());
        }
    }

    #[test]
    fn records_program_name_changes() {
        let mut n = RecordingNotifier::default();
        n.xds_program_name("Star Trek");
        n.xds_program_name("Star Trek");
        assert_eq!(n.program_names, vec!["Star Trek", "Star Trek"]);
    }

    #[test]
    fn null_notifier_is_a_noop() {
        let mut n = NullNotifier;
        n.xds_program_name("ignored");
        n.progress(Some(50), 1, 2);
    }
}
