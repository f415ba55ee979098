use indicatif::{ProgressState, ProgressStyle};

/// Template used for the site progress bar
const SITE_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.green/blue} {pos}/{len} sites ({percent}); ETA: {eta_precise}; {per_sec} {msg}";

/// Progress bar styling for the per-site calling loop
pub fn get_progress_style() -> ProgressStyle {
    ProgressStyle::with_template(SITE_TEMPLATE)
        .unwrap()
        .with_key("percent", |state: &ProgressState, w: &mut dyn std::fmt::Write| write!(w, "{:.1}%", state.fraction() * 100.0).unwrap())
        .with_key("per_sec", |state: &ProgressState, w: &mut dyn std::fmt::Write| write!(w, "{:.0} sites/s", state.per_sec()).unwrap())
        .progress_chars("=>-")
}
