mod common;

use common::{GridFixture, WAVELENGTHS, read_fits, standard_template, template_bytes, StepSpec};
use serde_json::json;
use spsgrid_core::config::SplitSpec;
use spsgrid_core::{ConvertError, ConvertRequest, convert};

#[test]
fn converts_two_templates_into_one_container() {
    let fixture = GridFixture::new();
    let summary = convert(&ConvertRequest::new(fixture.config_path())).expect("conversion succeeds");

    assert_eq!(summary.templates, 2);
    assert_eq!(summary.samples, 6);
    assert_eq!(summary.line_samples, 2);
    assert_eq!(summary.outputs, vec![fixture.path("grid.fits")]);
    assert_eq!(fixture.fits_files(), summary.outputs);

    let hdus = read_fits(&summary.outputs[0]);
    assert_eq!(hdus.len(), 4);
    assert_eq!(hdus[0].int("NAXIS"), 0);
    assert_eq!(hdus[0].value("EXTEND").as_deref(), Some("T"));
    let names = hdus[1..]
        .iter()
        .map(|hdu| hdu.value("EXTNAME").expect("extension named"))
        .collect::<Vec<_>>();
    assert_eq!(names, ["PARAMETERS", "CONTINUUM", "LINES"]);

    let parameters = &hdus[1];
    assert_eq!(parameters.int("NAXIS2"), 1);
    assert_eq!(parameters.column("wavelengths"), WAVELENGTHS);
    assert_eq!(parameters.column("FWHM"), vec![2.5; 5]);
    assert_eq!(parameters.column("metallicity"), vec![0.004, 0.02]);
    assert_eq!(parameters.column("age"), vec![0.0, 1.0e6, 2.0e6]);
    assert_eq!(parameters.column("Wl_OIII_5007"), vec![5006.8]);
    assert_eq!(parameters.value("TUNIT1").as_deref(), Some("Ang"));
    assert_eq!(parameters.value("IMF").as_deref(), Some("chabrier"));
    assert_eq!(parameters.value("stellar_library").as_deref(), Some("miles"));

    let continuum = &hdus[2];
    assert_eq!(continuum.int("NAXIS2"), 6);
    assert_eq!(continuum.int("NAXIS1"), 4 + 4 + 5 * 4 + 4);
    assert_eq!(
        continuum.column_names(),
        ["metallicity", "age", "spectrum", "M_star"]
    );
    assert_eq!(
        continuum.column("metallicity"),
        vec![0.02, 0.02, 0.02, 0.004, 0.004, 0.004]
    );
    let spectrum = continuum.column("spectrum");
    assert_eq!(spectrum.len(), 6 * 5);
    assert_eq!(&spectrum[..5], &[10000.0, 20000.0, 30000.0, 40000.0, 50000.0]);
    assert_eq!(continuum.column("M_star"), vec![1.0, 0.9, 0.8, 2.0, 1.9, 1.8]);
}

#[test]
fn line_table_follows_the_presence_markers() {
    let fixture = GridFixture::new();
    let summary = convert(&ConvertRequest::new(fixture.config_path())).expect("conversion succeeds");
    let lines = &read_fits(&summary.outputs[0])[3];

    assert_eq!(lines.int("NAXIS2"), 2);
    let names = lines.column_names();
    assert_eq!(
        names.iter().filter(|name| name.starts_with("Lum_")).count(),
        2
    );
    assert_eq!(names[2], "Lum_OII_3727");
    assert_eq!(names.last().map(String::as_str), Some("M_star"));

    assert_eq!(lines.column("age"), vec![0.0, 2.0e6]);
    assert_eq!(lines.column("metallicity"), vec![0.02, 0.004]);
    assert_eq!(lines.column("Lum_OII_3727"), vec![10.0, 20.0]);
    assert_eq!(lines.column("Lum_OIII_5007"), vec![12.0, 22.0]);
    assert_eq!(lines.column("colden"), vec![10.0, 22.0]);
    assert_eq!(lines.column("fracdust"), vec![0.7, 0.7]);
    assert_eq!(lines.value("TUNIT3").as_deref(), Some("log(L_sun)"));
}

#[test]
fn companion_without_zero_age_row_repeats_its_first_value() {
    let fixture = GridFixture::new();
    fixture.write(
        "templates/ineb_z02.4color",
        "# log-age M_star\n6.0 0.9\n6.3 0.8\n",
    );

    let summary = convert(&ConvertRequest::new(fixture.config_path())).expect("conversion succeeds");
    let continuum = &read_fits(&summary.outputs[0])[2];
    assert_eq!(continuum.column("M_star")[..3], [0.9, 0.9, 0.8]);
}

#[test]
fn split_request_writes_one_file_per_axis_value() {
    let fixture = GridFixture::new();
    let request = ConvertRequest::new(fixture.config_path())
        .with_split(SplitSpec::new("metallicity").with_tag("Z"));
    let summary = convert(&request).expect("conversion succeeds");

    assert_eq!(
        summary.outputs,
        vec![
            fixture.path("grid_Z_0.004.fits"),
            fixture.path("grid_Z_0.02.fits")
        ]
    );

    for (path, value) in summary.outputs.iter().zip([0.004_f32, 0.02]) {
        let hdus = read_fits(path);
        assert_eq!(hdus[1].column("metallicity"), vec![value]);
        assert_eq!(hdus[1].value("TFORM3").as_deref(), Some("1E"));
        assert_eq!(hdus[2].int("NAXIS2"), 3);
        assert!(hdus[2].column("metallicity").iter().all(|sample| *sample == value));
        assert_eq!(hdus[3].int("NAXIS2"), 1);
    }
}

#[test]
fn configured_split_uses_the_axis_name_as_tag() {
    let fixture = GridFixture::new();
    fixture.write_config(json!({"split": {"axis": "metallicity"}}));
    let output_dir = fixture.path("out");

    let summary = convert(&ConvertRequest::new(fixture.config_path()).with_output_dir(&output_dir))
        .expect("conversion succeeds");
    assert_eq!(summary.outputs[0], output_dir.join("grid_metallicity_0.004.fits"));
    assert!(fixture.fits_files().is_empty());
}

#[test]
fn template_folder_overrides_the_list_directory() {
    let fixture = GridFixture::new();
    fixture.write(
        "grid.txt",
        "# file_name metallicity\nineb_z02.ineb 0.02\nineb_z0004.ineb 0.004\n",
    );

    let request = ConvertRequest::new(fixture.config_path())
        .with_template_folder(fixture.path("templates"));
    let summary = convert(&request).expect("conversion succeeds");
    assert_eq!(summary.samples, 6);
}

#[test]
fn commented_out_templates_are_skipped() {
    let fixture = GridFixture::new();
    fixture.write(
        "grid.txt",
        "# file_name metallicity\n# metallicity sweep, solar first\ntemplates/ineb_z02.ineb 0.02\n# templates/ineb_z0004.ineb 0.004\n",
    );

    let summary = convert(&ConvertRequest::new(fixture.config_path())).expect("conversion succeeds");
    assert_eq!(summary.templates, 1);
    assert_eq!(summary.samples, 3);

    let parameters = &read_fits(&summary.outputs[0])[1];
    assert_eq!(parameters.column("metallicity"), vec![0.02]);
}

#[test]
fn truncated_template_aborts_without_output() {
    let fixture = GridFixture::new();
    let bytes = standard_template(20.0, 2);
    fixture.write("templates/ineb_z0004.ineb", &bytes[..bytes.len() - 10]);

    let error = convert(&ConvertRequest::new(fixture.config_path())).expect_err("template is short");
    match &error {
        ConvertError::TruncatedRecord { template, .. } => {
            assert!(template.ends_with("ineb_z0004.ineb"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(error.exit_code(), 2);
    assert!(fixture.fits_files().is_empty());
}

#[test]
fn differing_wavelength_axis_is_rejected() {
    let fixture = GridFixture::new();
    let mut shifted = WAVELENGTHS;
    shifted[3] += 1.0;
    let steps = (0..3)
        .map(|index| StepSpec {
            base: index as f32,
            lines: None,
        })
        .collect::<Vec<_>>();
    fixture.write(
        "templates/ineb_z0004.ineb",
        template_bytes(&common::AGES, &shifted, &steps),
    );

    let error = convert(&ConvertRequest::new(fixture.config_path())).expect_err("axis differs");
    assert!(matches!(error, ConvertError::WavelengthAxisMismatch { index: 3, .. }));
    assert!(fixture.fits_files().is_empty());
}

#[test]
fn missing_companion_lists_the_candidates() {
    let fixture = GridFixture::new();
    std::fs::remove_file(fixture.path("templates/ineb_z0004.4color")).expect("companion removed");

    let error = convert(&ConvertRequest::new(fixture.config_path())).expect_err("no companion");
    match error {
        ConvertError::MissingCompanionFile { tried, .. } => assert_eq!(tried.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fixture.fits_files().is_empty());
}

#[test]
fn unknown_split_axis_is_an_input_error() {
    let fixture = GridFixture::new();
    let request =
        ConvertRequest::new(fixture.config_path()).with_split(SplitSpec::new("logU"));

    let error = convert(&request).expect_err("logU is not an axis");
    assert_eq!(error.code(), "INPUT.UNKNOWN_SPLIT_AXIS");
}

#[test]
fn missing_configuration_is_an_io_error() {
    let fixture = GridFixture::new();
    let error = convert(&ConvertRequest::new(fixture.path("absent.json")))
        .expect_err("no configuration file");
    assert_eq!(error.exit_code(), 3);
    assert!(error.diagnostic_line().starts_with("ERROR: [IO.FILE]"));
}
