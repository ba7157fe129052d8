//! Shanghai/Shenzhen trading calendar helpers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Asia::Shanghai;

/// Continuous auction windows, inclusive on both ends.
const SESSIONS: [((u32, u32), (u32, u32)); 2] = [((9, 30), (11, 30)), ((13, 0), (15, 0))];

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// True when `time` falls inside the morning or afternoon session.
pub fn in_session(time: NaiveTime) -> bool {
    SESSIONS
        .iter()
        .any(|((sh, sm), (eh, em))| time >= hm(*sh, *sm) && time <= hm(*eh, *em))
}

/// Current calendar date at the exchange.
pub fn exchange_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Shanghai).date_naive()
}

/// True on weekdays while either session is open. Holidays are not known.
pub fn is_trading_time(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&Shanghai);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    in_session(local.time())
}
