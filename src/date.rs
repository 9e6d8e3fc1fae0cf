use std::collections::HashMap;

use chrono::prelude::*;
use chrono::Duration;
use lazy_static::lazy_static;

lazy_static! {
    /// Zone abbreviations `dtparse` doesn't know on its own, in seconds east
    /// of UTC.
    static ref TZ_INFOS: HashMap<String, i32> = {
        let mut tz = HashMap::with_capacity(8);
        tz.insert("UT".to_string(), 0);
        tz.insert("GMT".to_string(), 0);
        tz.insert("ET".to_string(), -4 * 3600);
        tz.insert("EDT".to_string(), -4 * 3600);
        tz.insert("EST".to_string(), -5 * 3600);
        tz.insert("PDT".to_string(), -7 * 3600);
        tz.insert("PST".to_string(), -8 * 3600);
        tz
    };
}

/// Parses the value of a `Date:` header using fuzzy searching with
/// `dtparse`, so trailing comments like `(PDT)` don't get in the way.
///
/// A date without offset is taken as UTC.
pub fn parse_mail_date(s: &str) -> Option<DateTime<Utc>> {
    let parser = dtparse::Parser::default();
    let (naive, offset, _) = parser
        .parse(
            s, None, None, true, /* turns on fuzzy mode */
            false, None, false, &TZ_INFOS,
        )
        .ok()?;

    match offset {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Whether a message sent at `date` is at most `max_age` old at `now`.
///
/// Dates that can't be parsed count as recent, the filter only ever drops
/// mail it is sure about.
pub fn is_recent(date: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
    match parse_mail_date(date) {
        Some(sent) => now.signed_duration_since(sent) <= max_age,
        None => true,
    }
}
