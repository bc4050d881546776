use sqlx::{Executor, FromRow, MySql, MySqlPool};

use crate::attendance::sheet::{AttendanceWrite, DayWrite, MonthBook};
use crate::auth::auth::Scope;
use crate::model::attendance::{
    AttendanceKey, AttendanceRecord, DayOfMonth, GeoPoint, MonthNumber,
};

const COLUMNS: &str = "employee_id, month, day, status, `timestamp`, check_out_time, \
     overtime_hours, overtime_multiplier, latitude, longitude, device_info, distance";

#[derive(Debug, FromRow)]
pub struct AttendanceRow {
    pub employee_id: String,
    pub month: u8,
    pub day: String,
    pub status: String,
    pub timestamp: String,
    pub check_out_time: Option<String>,
    pub overtime_hours: Option<f64>,
    pub overtime_multiplier: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_info: Option<String>,
    pub distance: Option<f64>,
}

impl AttendanceRow {
    /// `None` for rows that do not fit the typed model; they are logged and
    /// skipped rather than failing the whole load.
    pub fn into_entry(self) -> Option<(AttendanceKey, AttendanceRecord)> {
        let (Some(month), Some(day), Ok(status)) = (
            MonthNumber::new(self.month),
            DayOfMonth::parse_key(&self.day),
            self.status.parse(),
        ) else {
            tracing::warn!(
                employee_id = %self.employee_id,
                month = self.month,
                day = %self.day,
                status = %self.status,
                "Skipping malformed attendance row"
            );
            return None;
        };

        let location = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };

        let record = AttendanceRecord {
            status,
            timestamp: self.timestamp,
            check_out_time: self.check_out_time,
            overtime_hours: self.overtime_hours,
            overtime_multiplier: self.overtime_multiplier,
            location,
            device_info: self.device_info,
            distance: self.distance,
        };

        Some((AttendanceKey::new(self.employee_id, month, day), record))
    }
}

pub async fn fetch_record(
    pool: &MySqlPool,
    key: &AttendanceKey,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM attendance WHERE employee_id = ? AND month = ? AND day = ?"
    );

    let row = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(&key.employee_id)
        .bind(key.month.get())
        .bind(key.day.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(AttendanceRow::into_entry).map(|(_, record)| record))
}

/// Every record of `month` the scope may see. A pinned scope is applied in
/// the query, not after it.
pub async fn load_month(
    pool: &MySqlPool,
    month: MonthNumber,
    scope: &Scope,
) -> Result<MonthBook, sqlx::Error> {
    let rows = match scope.employee_id() {
        Some(employee_id) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM attendance WHERE month = ? AND employee_id = ?"
            );
            sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(month.get())
                .bind(employee_id)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {COLUMNS} FROM attendance WHERE month = ?");
            sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(month.get())
                .fetch_all(pool)
                .await?
        }
    };

    let mut book = MonthBook::new(month);
    for (key, record) in rows.into_iter().filter_map(AttendanceRow::into_entry) {
        book.apply(AttendanceWrite {
            key,
            write: DayWrite::Replace(record),
        });
    }

    tracing::debug!(month = month.get(), employees = book.employee_count(), "Loaded month");
    Ok(book)
}

/// Insert-or-replace on (employee_id, month, day), or delete the key.
pub async fn apply_write<'c, E>(executor: E, write: &AttendanceWrite) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let key = &write.key;

    match &write.write {
        DayWrite::Delete => {
            sqlx::query("DELETE FROM attendance WHERE employee_id = ? AND month = ? AND day = ?")
                .bind(&key.employee_id)
                .bind(key.month.get())
                .bind(key.day.to_string())
                .execute(executor)
                .await?;
        }
        DayWrite::Replace(record) => {
            let sql = format!(
                r#"
                INSERT INTO attendance ({COLUMNS})
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE
                    status = VALUES(status),
                    `timestamp` = VALUES(`timestamp`),
                    check_out_time = VALUES(check_out_time),
                    overtime_hours = VALUES(overtime_hours),
                    overtime_multiplier = VALUES(overtime_multiplier),
                    latitude = VALUES(latitude),
                    longitude = VALUES(longitude),
                    device_info = VALUES(device_info),
                    distance = VALUES(distance)
                "#
            );

            sqlx::query(&sql)
                .bind(&key.employee_id)
                .bind(key.month.get())
                .bind(key.day.to_string())
                .bind(record.status.as_ref())
                .bind(&record.timestamp)
                .bind(&record.check_out_time)
                .bind(record.overtime_hours)
                .bind(record.overtime_multiplier)
                .bind(record.location.map(|p| p.latitude))
                .bind(record.location.map(|p| p.longitude))
                .bind(&record.device_info)
                .bind(record.distance)
                .execute(executor)
                .await?;
        }
    }

    Ok(())
}

/// Applies every write or none of them.
pub async fn apply_all(pool: &MySqlPool, writes: &[AttendanceWrite]) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    for write in writes {
        apply_write(&mut *tx, write).await?;
    }

    tx.commit().await?;
    Ok(writes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;

    fn row() -> AttendanceRow {
        AttendanceRow {
            employee_id: "ID001".into(),
            month: 3,
            day: "07".into(),
            status: "early_leave".into(),
            timestamp: "08:01".into(),
            check_out_time: Some("16:00".into()),
            overtime_hours: None,
            overtime_multiplier: None,
            latitude: Some(10.0),
            longitude: Some(106.0),
            device_info: Some("ua".into()),
            distance: Some(12.0),
        }
    }

    #[test]
    fn row_maps_to_typed_key_and_record() {
        let (key, record) = row().into_entry().unwrap();
        assert_eq!(key.employee_id, "ID001");
        assert_eq!(key.month.get(), 3);
        assert_eq!(key.day.get(), 7);
        assert_eq!(record.status, AttendanceStatus::EarlyLeave);
        assert_eq!(record.location, Some(GeoPoint::new(10.0, 106.0)));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut bad_status = row();
        bad_status.status = "vacation".into();
        assert!(bad_status.into_entry().is_none());

        let mut bad_day = row();
        bad_day.day = "40".into();
        assert!(bad_day.into_entry().is_none());

        let mut bad_month = row();
        bad_month.month = 0;
        assert!(bad_month.into_entry().is_none());
    }

    #[test]
    fn half_a_location_is_no_location() {
        let mut r = row();
        r.longitude = None;
        let (_, record) = r.into_entry().unwrap();
        assert_eq!(record.location, None);
    }
}
