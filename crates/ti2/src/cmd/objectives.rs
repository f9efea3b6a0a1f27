use serde::Serialize;
use ti2_scope::{Microscope, ObjectiveInfo};
use ti2_transport::BulkTransport;

use crate::cmd::Session;
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_all, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct Objective {
    slot: usize,
    #[serde(flatten)]
    info: ObjectiveInfo,
}

impl Record for Objective {
    fn columns() -> &'static [&'static str] {
        &[
            "SLOT", "MODEL", "SERIES", "MAG", "NA", "WD", "OBSERVATION", "IMMERSION", "PFS",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let info = &self.info;
        vec![
            self.slot.to_string(),
            info.model.clone(),
            info.series.clone(),
            fixed(i64::from(info.magnification), 10, 1) + "x",
            fixed(i64::from(info.numerical_aperture), 100, 2),
            fixed(i64::from(info.working_distance), 100, 2) + " mm",
            info.observation.clone(),
            info.refractive_index.clone(),
            if info.pfs { "yes" } else { "no" }.to_string(),
        ]
    }
}

/// Render an integer in `1/scale` units as a decimal with `places` digits.
fn fixed(value: i64, scale: i64, places: usize) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let value = value.abs();
    format!(
        "{sign}{}.{:0places$}",
        value / scale,
        value % scale,
        places = places
    )
}

pub async fn run(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    let objectives = collect(&scope).await?;
    print_all(&objectives, format);
    Ok(SUCCESS)
}

async fn collect<T: BulkTransport + 'static>(scope: &Microscope<T>) -> CliResult<Vec<Objective>> {
    let infos = scope
        .objective_infos()
        .await
        .map_err(|err| scope_error("objective query failed", err))?;
    Ok(infos
        .into_iter()
        .enumerate()
        .map(|(slot, info)| Objective { slot, info })
        .collect())
}
