use ti2_scope::StatusEvent;

use crate::cmd::{parse_duration, Session, StatusArgs};
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_one, OutputFormat, Record};

impl Record for StatusEvent {
    fn columns() -> &'static [&'static str] {
        &[
            "X", "Y", "Z", "OBJECTIVE", "CONDENSER", "FILTER", "PATH", "DIA", "LIGHT", "SHUTTER",
            "ZOOM",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.x.to_string(),
            self.y.to_string(),
            self.z.to_string(),
            self.objective.to_string(),
            self.condenser.to_string(),
            self.filter.to_string(),
            self.optical_path.to_string(),
            format!("{:.3}", self.dia),
            on_off(self.light).to_string(),
            if self.shutter { "open" } else { "closed" }.to_string(),
            zoom_label(self.zoom),
        ]
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn zoom_label(zoom: i16) -> String {
    match zoom {
        0 => "moving".to_string(),
        1 => "1x".to_string(),
        2 => "1.5x".to_string(),
        other => other.to_string(),
    }
}

pub async fn run(args: StatusArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let idle = parse_duration(&args.idle)?;
    let scope = session.open()?;

    let status = if args.stable {
        scope.stable_status_after(idle).await
    } else {
        scope.current_status().await
    }
    .map_err(|err| scope_error("status read failed", err))?;

    print_one(&status, format);
    Ok(SUCCESS)
}
