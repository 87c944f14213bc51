use time::OffsetDateTime;

/// Restituisce l'istante corrente in UTC, usato per timbrare `createdAt`.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}
