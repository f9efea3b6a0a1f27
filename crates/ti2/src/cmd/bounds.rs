use serde::Serialize;
use ti2_scope::Microscope;
use ti2_transport::BulkTransport;

use crate::cmd::Session;
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_one, OutputFormat, Record};

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Bounds {
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    z_max: i32,
}

impl Record for Bounds {
    fn columns() -> &'static [&'static str] {
        &["X MIN", "X MAX", "Y MIN", "Y MAX", "Z MAX"]
    }

    fn cells(&self) -> Vec<String> {
        [self.x_min, self.x_max, self.y_min, self.y_max, self.z_max]
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

pub async fn run(session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    let bounds = query(&scope).await?;
    print_one(&bounds, format);
    Ok(SUCCESS)
}

async fn query<T: BulkTransport + 'static>(scope: &Microscope<T>) -> CliResult<Bounds> {
    let map = |err| scope_error("bound query failed", err);
    let (x_min, x_max) = scope.x_bounds().await.map_err(map)?;
    let (y_min, y_max) = scope.y_bounds().await.map_err(map)?;
    let z_max = scope.z_bound().await.map_err(map)?;
    Ok(Bounds {
        x_min,
        x_max,
        y_min,
        y_max,
        z_max,
    })
}

#[cfg(test)]
mod tests {
    use ti2_transport::{echo_response, MockTransport};

    use super::*;

    #[tokio::test]
    async fn collects_all_limits() {
        let mock = MockTransport::new().with_responder(|_, request| {
            let mut frame = echo_response(request).to_vec();
            let sign = if request[2] == 0x1B { -1 } else { 1 };
            let value = sign * i32::from(request[3]) * 1000;
            frame[6..10].copy_from_slice(&value.to_be_bytes());
            vec![frame.into()]
        });
        let scope = Microscope::new(mock);

        assert_eq!(
            query(&scope).await.unwrap(),
            Bounds {
                x_min: -8000,
                x_max: 8000,
                y_min: -12000,
                y_max: 12000,
                z_max: -4000,
            }
        );
    }
}
