use std::{io, path::Path};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser};
use tracing::info;

use crate::{
    platform::IntervalGranularity,
    present::{ListPresenter, OutputFormat},
    usage::{
        aggregate::UsageAggregator,
        gate::PermissionGate,
        screen::{PresentationState, UsageScreen},
    },
    utils::{
        clock::{Clock, DefaultClock},
        time::UsageWindow,
    },
};

use super::{Args, DateStyle, Services, OWNER_ID};

const DEFAULT_WINDOW_HOURS: u32 = 24;

#[derive(Debug, Parser)]
pub struct ShowCommand {
    #[arg(long, default_value_t = DEFAULT_WINDOW_HOURS, help = "Length of the usage window in hours")]
    hours: u32,
    #[arg(
        long = "end",
        short,
        help = "End of the usage window. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, default_value_t = IntervalGranularity::Daily, help = "Bucket size usage is queried with")]
    granularity: IntervalGranularity,
    #[arg(long, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

/// Resume only. Tells whether usage can be shown.
pub fn process_status_command(dir: &Path, colored: bool) -> Result<()> {
    let services = Services::open(dir)?;
    let mut screen = open_screen(&services, IntervalGranularity::Daily);
    let state = screen.on_resume();
    ListPresenter::new(OutputFormat::Table, colored).render_state(state, &mut io::stdout())
}

/// Resume followed by a refresh. Without usage data in the window nothing is printed.
pub async fn process_show_command(
    ShowCommand {
        hours,
        end_date,
        date_style,
        granularity,
        format,
    }: ShowCommand,
    dir: &Path,
    colored: bool,
) -> Result<()> {
    let window = resolve_window(end_date, hours, date_style, &DefaultClock)?;
    let services = Services::open(dir)?;
    let mut screen = open_screen(&services, granularity);

    screen.on_resume();
    let presenter = ListPresenter::new(format, colored);
    match screen.on_refresh(window).await? {
        PresentationState::PermissionGrantedIdle => {
            info!("Nothing to show");
            Ok(())
        }
        state => presenter.render_state(state, &mut io::stdout()),
    }
}

fn open_screen(services: &Services, granularity: IntervalGranularity) -> UsageScreen<'_> {
    UsageScreen::new(
        PermissionGate::new(&services.grants, std::process::id(), OWNER_ID),
        UsageAggregator::new(&services.usage, &services.registry, granularity),
    )
}

/// Window of `hours` ending at `end_date`, or now when no end was given.
fn resolve_window(
    end_date: Option<String>,
    hours: u32,
    date_style: DateStyle,
    clock: &dyn Clock,
) -> Result<UsageWindow> {
    let end = match end_date {
        Some(end_date) => parse_moment(&end_date, date_style, clock, "end")?,
        None => clock.time(),
    };
    UsageWindow::ending_at(end, Duration::hours(hours.into())).ok_or_else(|| {
        Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Usage window of {hours} hours ending at {end} is out of range"),
            )
            .into()
    })
}

pub(super) fn parse_moment(
    value: &str,
    date_style: DateStyle,
    clock: &dyn Clock,
    name: &str,
) -> Result<DateTime<Utc>> {
    let now = clock.time().with_timezone(&chrono::Local);
    match parse_date_string(value, now, date_style.into()) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};

    use crate::{cli::DateStyle, utils::clock::FixedClock};

    use super::resolve_window;

    #[test]
    fn test_default_window_ends_now() -> Result<()> {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let window = resolve_window(None, 24, DateStyle::Uk, &FixedClock(now))?;
        assert_eq!(window.end, now);
        assert_eq!(window.start, now - Duration::hours(24));
        Ok(())
    }

    #[test]
    fn test_relative_end() -> Result<()> {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let window = resolve_window(
            Some("1 hour ago".into()),
            2,
            DateStyle::Uk,
            &FixedClock(now),
        )?;
        assert_eq!(window.end, now - Duration::hours(1));
        assert_eq!(window.start, now - Duration::hours(3));
        Ok(())
    }

    #[test]
    fn test_invalid_end() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        assert!(resolve_window(
            Some("not a date at all".into()),
            24,
            DateStyle::Uk,
            &FixedClock(now)
        )
        .is_err());
    }

    #[test]
    fn test_window_out_of_range() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap();
        let error = resolve_window(None, u32::MAX, DateStyle::Uk, &FixedClock(now)).unwrap_err();
        assert!(error.to_string().contains("out of range"), "{error}");
    }
}
