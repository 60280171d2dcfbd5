use crate::results::ResultSet;
use crate::task::{TaskKind, TaskStatus};

/// Enablement and visibility of the front-end controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlVector {
    pub submit_enabled: bool,
    pub cancel_enabled: bool,
    pub filters_enabled: bool,
    pub remediation_enabled: bool,
    pub progress_visible: bool,
}

/// Map engine state onto control state.
///
/// `status` is `None` when no task is tracked. `kind` is the kind of the
/// task that produced `results`. `locked` is set while the profile editor
/// is open or a submission is waiting on the server.
pub fn project(
    status: Option<TaskStatus>,
    results: &ResultSet,
    kind: Option<TaskKind>,
    locked: bool,
) -> ControlVector {
    let active = status.is_some_and(|s| s.is_active());

    let remediation_enabled = !active
        && !locked
        && kind != Some(TaskKind::Fix)
        && matches!(results, ResultSet::Scan(rows) if rows.iter().any(|r| r.needs_attention()));

    ControlVector {
        submit_enabled: !active && !locked,
        cancel_enabled: active,
        // queued and cancelling still allow filter changes
        filters_enabled: status != Some(TaskStatus::Running),
        remediation_enabled,
        progress_visible: active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FixOutcome, FixRow, ScanRow};

    fn scan_row(path: &str, compatible: bool, error: Option<&str>) -> ScanRow {
        ScanRow {
            relative_path: path.to_string(),
            file_path: None,
            container: None,
            video_details: None,
            audio_tracks: Vec::new(),
            subtitle_codecs: Vec::new(),
            is_compatible: compatible,
            reason: None,
            error: error.map(str::to_string),
        }
    }

    fn needs_fix() -> ResultSet {
        ResultSet::Scan(vec![
            scan_row("a.mkv", true, None),
            scan_row("b.mkv", false, None),
        ])
    }

    const ALL_STATUSES: [TaskStatus; 6] = [
        TaskStatus::Queued,
        TaskStatus::Running,
        TaskStatus::Cancelling,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    #[test]
    fn test_idle_controls() {
        let controls = project(None, &ResultSet::Empty, None, false);
        assert_eq!(
            controls,
            ControlVector {
                submit_enabled: true,
                cancel_enabled: false,
                filters_enabled: true,
                remediation_enabled: false,
                progress_visible: false,
            }
        );
    }

    #[test]
    fn test_cancel_and_progress_follow_activity() {
        for status in ALL_STATUSES {
            let controls = project(Some(status), &ResultSet::Empty, Some(TaskKind::Scan), false);
            assert_eq!(controls.cancel_enabled, status.is_active(), "{status}");
            assert_eq!(controls.progress_visible, status.is_active(), "{status}");
            assert_eq!(controls.submit_enabled, !status.is_active(), "{status}");
        }
    }

    #[test]
    fn test_filters_only_locked_while_running() {
        for status in ALL_STATUSES {
            let controls = project(Some(status), &needs_fix(), Some(TaskKind::Scan), false);
            assert_eq!(
                controls.filters_enabled,
                status != TaskStatus::Running,
                "{status}"
            );
        }
    }

    #[test]
    fn test_editing_blocks_submit() {
        let controls = project(None, &needs_fix(), Some(TaskKind::Scan), true);
        assert!(!controls.submit_enabled);
        assert!(!controls.remediation_enabled);
    }

    #[test]
    fn test_remediation_requires_incompatible_scan_rows() {
        let scan = Some(TaskKind::Scan);
        assert!(project(None, &needs_fix(), scan, false).remediation_enabled);

        assert!(!project(None, &ResultSet::Empty, scan, false).remediation_enabled);
        assert!(
            !project(
                None,
                &ResultSet::Informational("No media files found.".to_string()),
                scan,
                false
            )
            .remediation_enabled
        );

        let all_ok = ResultSet::Scan(vec![scan_row("a.mkv", true, None)]);
        assert!(!project(None, &all_ok, scan, false).remediation_enabled);

        let only_errors = ResultSet::Scan(vec![scan_row(
            "a.mkv",
            false,
            Some("ffprobe exited with status 1"),
        )]);
        assert!(!project(None, &only_errors, scan, false).remediation_enabled);

        let fixes = ResultSet::Fix(vec![FixRow {
            relative_path: Some("b.mkv".to_string()),
            status: FixOutcome::Failed,
            message: "ffmpeg error".to_string(),
        }]);
        assert!(!project(None, &fixes, Some(TaskKind::Fix), false).remediation_enabled);
    }

    #[test]
    fn test_remediation_disabled_while_active() {
        for status in ALL_STATUSES.into_iter().filter(TaskStatus::is_active) {
            let controls = project(Some(status), &needs_fix(), Some(TaskKind::Scan), false);
            assert!(!controls.remediation_enabled, "{status}");
        }
    }
}
