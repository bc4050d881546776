//! Check-in and check-out classification.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::geo::distance_m;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoPoint};
use crate::model::settings::{SystemSettings, parse_clock};

/// A single check-in or check-out attempt as reported by the device.
#[derive(Debug, Clone)]
pub struct Punch {
    pub at: NaiveTime,
    /// `None` when the device denied or could not produce a position.
    pub location: Option<GeoPoint>,
    pub device_info: Option<String>,
}

/// The employee was further from the office than allowed. The punch is
/// still recorded.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeofenceWarning {
    #[schema(example = 312.0)]
    pub distance_m: f64,
    #[schema(example = 100.0)]
    pub allowed_radius_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PunchOutcome {
    pub record: AttendanceRecord,
    pub geofence: Option<GeofenceWarning>,
}

/// "HH:MM", the form check-in and check-out times are displayed and stored in.
pub fn clock_label(at: NaiveTime) -> String {
    at.format("%H:%M").to_string()
}

/// Strictly after the start minute.
pub fn is_late(at: NaiveTime, start: (u32, u32)) -> bool {
    (at.hour(), at.minute()) > start
}

/// Strictly before the end minute.
pub fn is_early_leave(at: NaiveTime, end: (u32, u32)) -> bool {
    (at.hour(), at.minute()) < end
}

struct Fix {
    location: GeoPoint,
    distance: Option<f64>,
    warning: Option<GeofenceWarning>,
}

fn locate(settings: &SystemSettings, location: Option<GeoPoint>) -> Result<Fix, AppError> {
    let location = location.ok_or_else(|| {
        AppError::LocationUnavailable("enable GPS and allow location access".into())
    })?;

    let Some(office) = settings.office() else {
        return Ok(Fix {
            location,
            distance: None,
            warning: None,
        });
    };

    let distance = distance_m(location, office);
    let warning = (distance > settings.allowed_radius).then(|| GeofenceWarning {
        distance_m: distance.round(),
        allowed_radius_m: settings.allowed_radius,
    });

    Ok(Fix {
        location,
        distance: Some(distance.round()),
        warning,
    })
}

/// Builds today's record for a check-in.
///
/// `today` is the record already stored for the day, if any.
pub fn check_in(
    punch: Punch,
    settings: Option<&SystemSettings>,
    today: Option<&AttendanceRecord>,
) -> Result<PunchOutcome, AppError> {
    let settings = settings.ok_or(AppError::SettingsNotLoaded)?;
    let start = parse_clock(&settings.work_start_time)?;
    let fix = locate(settings, punch.location)?;

    if today.is_some() {
        return Err(AppError::AlreadyCheckedIn);
    }

    let status = if is_late(punch.at, start) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    };

    let mut record = AttendanceRecord::new(status, clock_label(punch.at));
    record.location = Some(fix.location);
    record.device_info = punch.device_info;
    record.distance = fix.distance;

    Ok(PunchOutcome {
        record,
        geofence: fix.warning,
    })
}

/// Merges a check-out into today's record. Only the status may change,
/// and only to `early_leave`.
pub fn check_out(
    punch: Punch,
    settings: Option<&SystemSettings>,
    today: Option<&AttendanceRecord>,
) -> Result<PunchOutcome, AppError> {
    let settings = settings.ok_or(AppError::SettingsNotLoaded)?;
    let end = parse_clock(&settings.work_end_time)?;
    let fix = locate(settings, punch.location)?;

    let today = today.ok_or(AppError::NoCheckIn)?;
    if today.has_checked_out() {
        return Err(AppError::AlreadyCheckedOut);
    }

    let mut record = today.clone();
    record.check_out_time = Some(clock_label(punch.at));
    if is_early_leave(punch.at, end) {
        record.status = AttendanceStatus::EarlyLeave;
    }

    Ok(PunchOutcome {
        record,
        geofence: fix.warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::settings::SettingsSnapshot;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn punch(h: u32, m: u32) -> Punch {
        Punch {
            at: at(h, m),
            location: Some(GeoPoint::new(10.0, 106.0)),
            device_info: Some("test-agent".into()),
        }
    }

    fn office_settings() -> SystemSettings {
        SystemSettings {
            office_lat: 10.0,
            office_lng: 106.0,
            ..SystemSettings::default()
        }
    }

    #[test]
    fn late_only_after_start_minute() {
        let settings = SystemSettings::default();
        let status = |h, m| {
            check_in(punch(h, m), Some(&settings), None)
                .unwrap()
                .record
                .status
        };

        assert_eq!(status(8, 1), AttendanceStatus::Late);
        assert_eq!(status(7, 59), AttendanceStatus::Present);
        assert_eq!(status(8, 0), AttendanceStatus::Present);
        assert_eq!(status(9, 0), AttendanceStatus::Late);
    }

    #[test]
    fn seconds_do_not_make_a_check_in_late() {
        let settings = SystemSettings::default();
        let mut p = punch(8, 0);
        p.at = NaiveTime::from_hms_opt(8, 0, 59).unwrap();
        let outcome = check_in(p, Some(&settings), None).unwrap();
        assert_eq!(outcome.record.status, AttendanceStatus::Present);
        assert_eq!(outcome.record.timestamp, "08:00");
    }

    #[test]
    fn check_in_captures_location_and_device() {
        let settings = office_settings();
        let mut p = punch(7, 55);
        p.location = Some(GeoPoint::new(10.001, 106.0));

        let outcome = check_in(p, Some(&settings), None).unwrap();
        assert_eq!(outcome.record.location, Some(GeoPoint::new(10.001, 106.0)));
        assert_eq!(outcome.record.device_info.as_deref(), Some("test-agent"));
        assert_eq!(outcome.record.distance, Some(111.0));
        assert_eq!(outcome.record.check_out_time, None);
        assert!(outcome.geofence.is_some());
    }

    #[test]
    fn outside_radius_is_a_warning_not_a_rejection() {
        let settings = SystemSettings {
            allowed_radius: 50.0,
            ..office_settings()
        };
        let mut p = punch(7, 30);
        p.location = Some(GeoPoint::new(10.01, 106.0));

        let outcome = check_in(p, Some(&settings), None).unwrap();
        let warning = outcome.geofence.unwrap();
        assert!(warning.distance_m > 1_000.0);
        assert_eq!(warning.allowed_radius_m, 50.0);
        assert_eq!(outcome.record.status, AttendanceStatus::Present);
    }

    #[test]
    fn no_distance_without_office() {
        let outcome = check_in(punch(7, 30), Some(&SystemSettings::default()), None).unwrap();
        assert_eq!(outcome.record.distance, None);
        assert!(outcome.geofence.is_none());
    }

    #[test]
    fn check_in_prerequisites() {
        let settings = SystemSettings::default();

        assert!(matches!(
            check_in(punch(8, 0), None, None),
            Err(AppError::SettingsNotLoaded)
        ));

        let mut p = punch(8, 0);
        p.location = None;
        assert!(matches!(
            check_in(p, Some(&settings), None),
            Err(AppError::LocationUnavailable(_))
        ));

        let existing = AttendanceRecord::new(AttendanceStatus::Present, "07:50");
        assert!(matches!(
            check_in(punch(8, 0), Some(&settings), Some(&existing)),
            Err(AppError::AlreadyCheckedIn)
        ));
    }

    #[actix_web::test]
    async fn check_in_succeeds_once_empty_settings_are_loaded() {
        let snapshot: SettingsSnapshot = SettingsSnapshot::new();
        assert!(matches!(
            check_in(punch(8, 0), snapshot.get().as_deref(), None),
            Err(AppError::SettingsNotLoaded)
        ));

        let settings = snapshot
            .get_or_load(|| async { Ok::<_, sqlx::Error>(office_settings()) })
            .await
            .unwrap();
        let outcome = check_in(punch(8, 0), settings.as_deref(), None).unwrap();
        assert_eq!(outcome.record.status, AttendanceStatus::Present);
    }

    #[test]
    fn early_leave_only_before_end_minute() {
        let settings = SystemSettings::default();
        let today = AttendanceRecord::new(AttendanceStatus::Present, "07:58");

        let early = check_out(punch(17, 29), Some(&settings), Some(&today)).unwrap();
        assert_eq!(early.record.status, AttendanceStatus::EarlyLeave);

        let on_time = check_out(punch(17, 30), Some(&settings), Some(&today)).unwrap();
        assert_eq!(on_time.record.status, AttendanceStatus::Present);
        assert_eq!(on_time.record.check_out_time.as_deref(), Some("17:30"));
    }

    #[test]
    fn check_out_never_upgrades_late_to_present() {
        let settings = SystemSettings::default();
        let today = AttendanceRecord::new(AttendanceStatus::Late, "08:20");
        let outcome = check_out(punch(18, 0), Some(&settings), Some(&today)).unwrap();
        assert_eq!(outcome.record.status, AttendanceStatus::Late);
    }

    #[test]
    fn check_out_merges_into_existing_record() {
        let settings = office_settings();
        let mut today = AttendanceRecord::new(AttendanceStatus::Present, "07:58");
        today.location = Some(GeoPoint::new(10.0002, 106.0));
        today.device_info = Some("phone".into());
        today.distance = Some(22.0);
        today.overtime_hours = Some(1.0);
        today.overtime_multiplier = Some(1.5);

        let outcome = check_out(punch(17, 45), Some(&settings), Some(&today)).unwrap();
        let merged = outcome.record;
        assert_eq!(merged.timestamp, "07:58");
        assert_eq!(merged.location, today.location);
        assert_eq!(merged.device_info.as_deref(), Some("phone"));
        assert_eq!(merged.distance, Some(22.0));
        assert_eq!(merged.overtime_hours, Some(1.0));
        assert_eq!(merged.overtime_multiplier, Some(1.5));
        assert_eq!(merged.check_out_time.as_deref(), Some("17:45"));
    }

    #[test]
    fn check_out_without_check_in_fails() {
        let settings = SystemSettings::default();
        assert!(matches!(
            check_out(punch(17, 30), Some(&settings), None),
            Err(AppError::NoCheckIn)
        ));
    }

    #[test]
    fn second_check_out_is_rejected() {
        let settings = SystemSettings::default();
        let mut today = AttendanceRecord::new(AttendanceStatus::Present, "07:58");
        today.check_out_time = Some("17:31".into());
        assert!(matches!(
            check_out(punch(18, 0), Some(&settings), Some(&today)),
            Err(AppError::AlreadyCheckedOut)
        ));
    }
}
