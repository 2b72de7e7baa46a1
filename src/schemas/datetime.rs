use serde::de::Error as _;
use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

/// Accepts RFC 3339 plus the offset-less `datetime-local` shapes browsers send,
/// which are read as UTC.
pub(crate) fn parse_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    let raw = raw.trim().replacen(' ', "T", 1);
    if let Ok(value) =
        PrimitiveDateTime::parse(&raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        &raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

pub(crate) fn deserialize_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

pub(crate) fn deserialize_option_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn deserialize_nullable_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_option_flexible(deserializer).map(Some)
}

pub(crate) fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn offsets_are_kept_for_later_normalisation() {
        let value = parse_flexible("2025-03-01T09:00:00+07:00").unwrap();
        assert_eq!(value.to_offset(time::UtcOffset::UTC), datetime!(2025-03-01 02:00 UTC));
    }

    #[test]
    fn datetime_local_shapes_are_read_as_utc() {
        assert_eq!(parse_flexible("2025-03-01T09:00"), Some(datetime!(2025-03-01 09:00 UTC)));
        assert_eq!(parse_flexible("2025-03-01 09:00:30"), Some(datetime!(2025-03-01 09:00:30 UTC)));
        assert_eq!(parse_flexible("01/03/2025"), None);
    }
}
