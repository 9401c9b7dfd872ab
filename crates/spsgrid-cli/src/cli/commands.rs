use super::CliError;
use anyhow::Context;
use spsgrid_core::config::SplitSpec;
use spsgrid_core::domain::ByteOrder;
use spsgrid_core::template::TemplateExtractor;
use spsgrid_core::{ConvertRequest, convert};
use std::io::Write;
use std::path::PathBuf;

/// Axis and file-name tag used by `--split-files` when the configuration
/// names no split.
const DEFAULT_SPLIT_AXIS: &str = "metallicity";
const DEFAULT_SPLIT_TAG: &str = "Z";

#[derive(clap::Args)]
pub(super) struct ConvertArgs {
    /// JSON configuration file
    #[arg(long = "json-file", short = 'j', value_name = "PATH")]
    json_file: PathBuf,

    /// Folder holding the template files named in the templates list
    #[arg(long, value_name = "DIR")]
    folder: Option<PathBuf>,

    /// Directory for the FITS output (default: next to the templates list)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Write one file per metallicity (or per the configured split axis)
    #[arg(long, conflicts_with = "split_by")]
    split_files: bool,

    /// Write one file per distinct value of this grid axis
    #[arg(long, value_name = "AXIS")]
    split_by: Option<String>,
}

impl ConvertArgs {
    fn into_request(self) -> ConvertRequest {
        let mut request = ConvertRequest::new(self.json_file);
        if let Some(folder) = self.folder {
            request = request.with_template_folder(folder);
        }
        if let Some(output_dir) = self.output_dir {
            request = request.with_output_dir(output_dir);
        }
        if let Some(axis) = self.split_by {
            request = request.with_split(SplitSpec::new(axis));
        } else if self.split_files {
            request = request
                .with_fallback_split(SplitSpec::new(DEFAULT_SPLIT_AXIS).with_tag(DEFAULT_SPLIT_TAG));
        }
        request
    }
}

#[derive(clap::Args)]
pub(super) struct InspectArgs {
    /// Binary template file
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Byte order the template was written in
    #[arg(long, default_value_t = ByteOrder::Little)]
    byte_order: ByteOrder,
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let request = args.into_request();
    tracing::debug!(
        config = %request.config_path.display(),
        split = ?request.split_override.as_ref().or(request.fallback_split.as_ref()),
        "dispatching convert"
    );
    let summary = convert(&request).map_err(CliError::Convert)?;

    let mut lines = vec![format!(
        "Converted {} templates ({} samples, {} with emission lines).",
        summary.templates, summary.samples, summary.line_samples
    )];
    lines.extend(
        summary
            .outputs
            .iter()
            .map(|path| format!("Wrote {}", path.display())),
    );
    print_lines(&lines)?;
    Ok(0)
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let mut extractor = TemplateExtractor::new(args.byte_order);
    let record = extractor
        .extract(&args.template, &[])
        .map_err(CliError::Convert)?;

    let (first_age, last_age) = match (record.time_steps.first(), record.time_steps.last()) {
        (Some(first), Some(last)) => (first.to_string(), last.to_string()),
        _ => ("-".to_string(), "-".to_string()),
    };
    let lines = [
        format!("template: {}", args.template.display()),
        format!("byte order: {}", args.byte_order),
        format!("steps: {}", record.step_count()),
        format!("ages: {first_age} .. {last_age}"),
        format!("wavelengths: {}", record.wavelengths.len()),
        format!("line steps: {}", record.line_step_count()),
    ];
    print_lines(&lines)?;
    Ok(0)
}

fn print_lines(lines: &[String]) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}").context("failed to write to stdout")?;
    }
    stdout.flush().context("failed to flush stdout")?;
    Ok(())
}
