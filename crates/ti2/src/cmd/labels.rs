use serde::Serialize;
use ti2_scope::{LabelKind, Microscope};
use ti2_transport::BulkTransport;

use crate::cmd::{LabelsArgs, Session};
use crate::exit::{scope_error, CliResult, SUCCESS};
use crate::output::{print_all, OutputFormat, Record};

#[derive(Debug, Serialize)]
struct Label {
    kind: LabelKind,
    slot: usize,
    label: String,
}

impl Record for Label {
    fn columns() -> &'static [&'static str] {
        &["KIND", "SLOT", "LABEL"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.kind.name().to_string(),
            self.slot.to_string(),
            self.label.clone(),
        ]
    }
}

pub async fn run(args: LabelsArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let scope = session.open()?;
    let labels = collect(&scope, args.kind.into()).await?;
    print_all(&labels, format);
    Ok(SUCCESS)
}

async fn collect<T: BulkTransport + 'static>(
    scope: &Microscope<T>,
    kind: LabelKind,
) -> CliResult<Vec<Label>> {
    let labels = scope
        .labels(kind)
        .await
        .map_err(|err| scope_error("label query failed", err))?;
    Ok(labels
        .into_iter()
        .enumerate()
        .map(|(slot, label)| Label { kind, slot, label })
        .collect())
}

#[cfg(test)]
mod tests {
    use ti2_transport::{echo_response, MockTransport};

    use super::*;

    #[tokio::test]
    async fn zoom_uses_short_labels() {
        let mock = MockTransport::new().with_responder(|_, request| {
            let mut frame = echo_response(request).to_vec();
            frame[10..50].fill(b' ');
            frame[10..19].copy_from_slice(b"Zoom long");
            let short: &[u8] = if request[9] == 1 { b"1x" } else { b"1.5x" };
            frame[40..40 + short.len()].copy_from_slice(short);
            vec![frame.into()]
        });
        let scope = Microscope::new(mock);

        let labels = collect(&scope, LabelKind::Zoom).await.unwrap();
        let names: Vec<_> = labels.iter().map(|label| label.label.as_str()).collect();
        assert_eq!(names, ["1x", "1.5x"]);

        let json = serde_json::to_value(&labels[1]).unwrap();
        assert_eq!(json["kind"], "zoom");
        assert_eq!(json["slot"], 1);
    }
}
