mod naming;
mod render;
mod store;

pub use naming::{artifact_file_name, find_latest_artifact, is_artifact_name, TIMESTAMP_FORMAT};
pub use render::{
    render_execution_report, render_perspective_report, ExecutionReportInput,
    PerspectiveReportInput, PERSPECTIVE_TABLE_BEGIN, PERSPECTIVE_TABLE_END,
};
pub use store::{FsReportStore, ReportKind, ReportStore};
