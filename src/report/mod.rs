pub mod render;
pub mod segment;

pub use render::{ReportStatus, assess, render_markdown};
pub use segment::{Fields, Section, segment};
