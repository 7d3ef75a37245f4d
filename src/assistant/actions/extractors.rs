//! Heuristic extractors for optional action fields. Each one scans the whole
//! reply independently; a miss simply yields `None`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::shared::models::constants::{PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_MEDIUM, PRIORITY_URGENT};

/// A quoted title, captured with its delimiters. The closing quote has to
/// pair with the opening one, so other quote marks may appear inside.
pub(super) const QUOTED: &str = r#"("[^"\n]{1,255}"|«[^»\n]{1,255}»|“[^”\n]{1,255}”|„[^“”\n]{1,255}[“”]|'[^'\n]{1,255}')"#;

const QUOTE_MARKS: [char; 7] = ['"', '«', '»', '“', '”', '„', '\''];

pub(super) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

/// Strips the delimiting quotes, surrounding whitespace and trailing
/// sentence punctuation.
pub(super) fn clean_title(raw: &str) -> Option<String> {
    let cleaned = unquote(raw.trim())
        .trim()
        .trim_end_matches(['.', ',', '!', '?', ':', ';'])
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn unquote(raw: &str) -> &str {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if QUOTE_MARKS.contains(&open) && QUOTE_MARKS.contains(&close) => {
            chars.as_str()
        }
        _ => raw,
    }
}

static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(r"(?i)описани(?:ем|е)\s*[:\-—]?\s*{}", QUOTED))
});

static PROJECT_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"(?i)(?:\bв\s+проект[еа]?|\bдля\s+проекта|\bк\s+проекту|\bв\s+рамках\s+проекта)\s*{}",
        QUOTED
    ))
});

// An explicit "... приоритет" phrase outranks urgency keywords.
static PRIORITY_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            compile(r"(?i)\bвысок\w*\s+приоритет|\bприоритет\w*\s*[:\-—]?\s*высок"),
            PRIORITY_HIGH,
        ),
        (
            compile(r"(?i)\bсредн\w*\s+приоритет|\bприоритет\w*\s*[:\-—]?\s*средн"),
            PRIORITY_MEDIUM,
        ),
        (
            compile(r"(?i)\bнизк\w*\s+приоритет|\bприоритет\w*\s*[:\-—]?\s*низк"),
            PRIORITY_LOW,
        ),
    ]
});

// Group 1 marks a negated keyword ("не срочно").
static URGENT_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(\bне\s+)?\b(?:критическ|срочн)\w*"));

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{4})-(\d{2})-(\d{2})\b"));
static DOTTED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{1,2})\.(\d{2})(?:\.(\d{4}|\d{2}))?\b"));
// Units that turn `12.50` into an amount rather than a date.
static AMOUNT_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)^\s*(?:%|млн|млрд|тыс|руб|₽|\$|€|ч\b|час|мин|км|кг|шт|раз)")
});
static IN_DAYS_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\bчерез\s+(\d{1,3})\s+(?:дн|день)"));
static IN_WEEKS_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\bчерез\s+(\d{1,2})\s+недел"));
static IN_ONE_WEEK_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bчерез\s+неделю\b"));
static IN_ONE_MONTH_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bчерез\s+месяц\b"));
static DAY_AFTER_TOMORROW_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bпослезавтра\b"));
static TOMORROW_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bзавтра\b"));
static TODAY_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bсегодня\b"));
static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(понедельник|вторник|сред[ау]|четверг|пятниц[ау]|суббот[ау]|воскресенье)\b")
});

pub fn extract_description(text: &str) -> Option<String> {
    DESCRIPTION_RE
        .captures(text)
        .and_then(|c| clean_title(&c[1]))
}

pub fn extract_project_hint(text: &str) -> Option<String> {
    PROJECT_HINT_RE
        .captures(text)
        .and_then(|c| clean_title(&c[1]))
}

/// Explicit priority phrases first, then urgency keywords that are not negated.
pub fn extract_priority(text: &str) -> Option<&'static str> {
    if let Some((_, priority)) = PRIORITY_RULES.iter().find(|(re, _)| re.is_match(text)) {
        return Some(*priority);
    }
    URGENT_RE
        .captures_iter(text)
        .any(|c| c.get(1).is_none())
        .then_some(PRIORITY_URGENT)
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn weekday_from_word(word: &str) -> Option<Weekday> {
    let lower = word.to_lowercase();
    let day = match lower.as_str() {
        "понедельник" => Weekday::Mon,
        "вторник" => Weekday::Tue,
        "среда" | "среду" => Weekday::Wed,
        "четверг" => Weekday::Thu,
        "пятница" | "пятницу" => Weekday::Fri,
        "суббота" | "субботу" => Weekday::Sat,
        "воскресенье" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Days until the next `target`, always in 1..=7.
pub(super) fn days_until_next(from: Weekday, target: Weekday) -> i64 {
    let diff = (target.num_days_from_monday() as i64 - from.num_days_from_monday() as i64 + 7) % 7;
    if diff == 0 {
        7
    } else {
        diff
    }
}

/// Resolves a deadline mentioned in the reply relative to `now`.
///
/// Absolute dates win over relative words; a bare `DD.MM` that already
/// passed this year rolls to next year.
pub fn extract_deadline(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(c) = ISO_DATE_RE.captures(text) {
        let date = NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        if let Some(dt) = date.and_then(start_of_day) {
            return Some(dt);
        }
    }

    let dotted = DOTTED_DATE_RE.captures_iter(text).find(|c| {
        c.get(0).is_some_and(|m| {
            let before = text[..m.start()].chars().next_back();
            !matches!(before, Some('.' | ',')) && !AMOUNT_SUFFIX_RE.is_match(&text[m.end()..])
        })
    });
    if let Some(c) = dotted {
        let day: u32 = c[1].parse().ok()?;
        let month: u32 = c[2].parse().ok()?;
        let explicit_year = c.get(3).and_then(|y| {
            let raw: i32 = y.as_str().parse().ok()?;
            Some(if y.as_str().len() == 2 { 2000 + raw } else { raw })
        });
        let date = match explicit_year {
            Some(year) => NaiveDate::from_ymd_opt(year, month, day),
            None => NaiveDate::from_ymd_opt(now.year(), month, day).and_then(|d| {
                if d < now.date_naive() {
                    NaiveDate::from_ymd_opt(now.year() + 1, month, day)
                } else {
                    Some(d)
                }
            }),
        };
        if let Some(dt) = date.and_then(start_of_day) {
            return Some(dt);
        }
    }

    if DAY_AFTER_TOMORROW_RE.is_match(text) {
        return Some(now + Duration::days(2));
    }
    if TOMORROW_RE.is_match(text) {
        return Some(now + Duration::days(1));
    }
    if TODAY_RE.is_match(text) {
        return Some(now);
    }
    if let Some(c) = IN_DAYS_RE.captures(text) {
        let days: i64 = c[1].parse().ok()?;
        return Some(now + Duration::days(days));
    }
    if let Some(c) = IN_WEEKS_RE.captures(text) {
        let weeks: i64 = c[1].parse().ok()?;
        return Some(now + Duration::weeks(weeks));
    }
    if IN_ONE_WEEK_RE.is_match(text) {
        return Some(now + Duration::days(7));
    }
    if IN_ONE_MONTH_RE.is_match(text) {
        return Some(now + Duration::days(30));
    }
    if let Some(c) = WEEKDAY_RE.captures(text) {
        let target = weekday_from_word(&c[1])?;
        return Some(now + Duration::days(days_until_next(now.weekday(), target)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // Friday
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 10, 30, 0).unwrap()
    }

    #[test]
    fn tomorrow_is_exactly_one_day_ahead() {
        let now = fixed_now();
        assert_eq!(
            extract_deadline("Срок выполнения — завтра.", now),
            Some(now + Duration::days(1))
        );
        assert_eq!(
            extract_deadline("Сделать послезавтра", now),
            Some(now + Duration::days(2))
        );
        assert_eq!(extract_deadline("Нужно сегодня", now), Some(now));
    }

    #[test]
    fn weekday_resolves_to_next_future_occurrence() {
        let now = fixed_now();
        assert_eq!(now.weekday(), Weekday::Fri);

        let monday = extract_deadline("дедлайн в понедельник", now).unwrap();
        assert_eq!(monday, now + Duration::days(3));
        assert_eq!(monday.weekday(), Weekday::Mon);

        // Same weekday as today means a week from now, never today
        let friday = extract_deadline("к пятнице? нет, в пятницу", now).unwrap();
        assert_eq!(friday, now + Duration::days(7));

        let thursday = extract_deadline("сдать в четверг", now).unwrap();
        assert_eq!(thursday, now + Duration::days(6));
    }

    #[test]
    fn weekday_offset_is_always_within_a_week() {
        let days = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        for from in days {
            for target in days {
                let d = days_until_next(from, target);
                assert!((1..=7).contains(&d), "{from:?} -> {target:?} = {d}");
            }
        }
    }

    #[test]
    fn relative_offsets() {
        let now = fixed_now();
        assert_eq!(extract_deadline("через 5 дней", now), Some(now + Duration::days(5)));
        assert_eq!(extract_deadline("через 2 недели", now), Some(now + Duration::weeks(2)));
        assert_eq!(extract_deadline("через неделю", now), Some(now + Duration::days(7)));
        assert_eq!(extract_deadline("через месяц", now), Some(now + Duration::days(30)));
    }

    #[test]
    fn absolute_dates() {
        let now = fixed_now();
        let expect = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();
        assert_eq!(extract_deadline("до 2026-12-01", now), Some(expect(2026, 12, 1)));
        assert_eq!(extract_deadline("до 25.12.2026", now), Some(expect(2026, 12, 25)));
        assert_eq!(extract_deadline("до 25.12.27", now), Some(expect(2027, 12, 25)));
        assert_eq!(extract_deadline("до 20.11", now), Some(expect(2026, 11, 20)));
        // Already passed this year
        assert_eq!(extract_deadline("до 01.03", now), Some(expect(2027, 3, 1)));
    }

    #[test]
    fn amounts_and_decimals_are_not_dates() {
        let now = fixed_now();
        assert_eq!(extract_deadline("бюджет 1.5 млн", now), None);
        assert_eq!(extract_deadline("бюджет 12.10 млн рублей", now), None);
        assert_eq!(extract_deadline("рост на 10.25%", now), None);
        assert_eq!(extract_deadline("версия 2.1.5", now), None);
        assert_eq!(
            extract_deadline("бюджет 1.5 млн, сдать до 20.11", now),
            Some(Utc.with_ymd_and_hms(2026, 11, 20, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn no_deadline_words_yield_none() {
        assert_eq!(extract_deadline("Проект создан.", fixed_now()), None);
        // Not a weekday: "средний" shares a stem with "среда"
        assert_eq!(extract_deadline("средний приоритет", fixed_now()), None);
    }

    #[test]
    fn priority_keywords() {
        assert_eq!(extract_priority("Это срочная задача"), Some(PRIORITY_URGENT));
        assert_eq!(extract_priority("с высоким приоритетом"), Some(PRIORITY_HIGH));
        assert_eq!(extract_priority("приоритет: средний"), Some(PRIORITY_MEDIUM));
        assert_eq!(extract_priority("Низкий приоритет"), Some(PRIORITY_LOW));
        assert_eq!(extract_priority("Проект создан"), None);
    }

    #[test]
    fn explicit_priority_phrase_beats_urgency_words() {
        assert_eq!(
            extract_priority("Проект «Сайт» создан. Не срочно, низкий приоритет."),
            Some(PRIORITY_LOW)
        );
        assert_eq!(extract_priority("Это не срочно"), None);
        assert_eq!(
            extract_priority("Не срочно сейчас, но критически важно к релизу"),
            Some(PRIORITY_URGENT)
        );
    }

    #[test]
    fn description_and_project_hint() {
        let text = "Задача «Макет» добавлена в проект «Сайт» с описанием «Главная страница».";
        assert_eq!(extract_description(text).as_deref(), Some("Главная страница"));
        assert_eq!(extract_project_hint(text).as_deref(), Some("Сайт"));

        assert_eq!(
            extract_project_hint("Создал задачу \"Docs\" для проекта \"Launch\"").as_deref(),
            Some("Launch")
        );
        assert_eq!(extract_project_hint("Проект «Сайт» создан"), None);
        assert_eq!(
            extract_project_hint("Задача добавлена в проект \"Joe's app\"").as_deref(),
            Some("Joe's app")
        );
    }

    #[test]
    fn clean_title_strips_punctuation() {
        assert_eq!(clean_title("  Launch. ").as_deref(), Some("Launch"));
        assert_eq!(clean_title(" ,. "), None);
        assert_eq!(clean_title("«Сайт»").as_deref(), Some("Сайт"));
        assert_eq!(clean_title("\"\"").as_deref(), None);
    }
}
