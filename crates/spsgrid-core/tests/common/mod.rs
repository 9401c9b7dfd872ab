#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const AGES: [f32; 3] = [0.0, 1.0e6, 2.0e6];
pub const WAVELENGTHS: [f32; 5] = [1000.0, 2000.0, 3000.0, 4000.0, 5000.0];

pub const CATALOG: &str = "\
# emission lines
wl:3727.0 use:T x name:OII_3727
wl:4861.3 use:F x name:Hbeta
wl:5006.8 use:T x name:OIII_5007
wl:6562.8 use:F x name:Halpha
";

const IONIC_FRACTION_BYTES: usize = 128;

pub struct StepSpec {
    pub base: f32,
    pub lines: Option<Vec<(f32, f32)>>,
}

/// Encodes a template the way the photoionisation code writes it: every
/// record bracketed by its byte length, little-endian.
pub fn template_bytes(ages: &[f32], wavelengths: &[f32], steps: &[StepSpec]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut record = |payload: Vec<u8>| {
        let length = (payload.len() as i32).to_le_bytes();
        bytes.extend_from_slice(&length);
        bytes.extend_from_slice(&payload);
        bytes.extend_from_slice(&length);
    };

    record(words(&[ages.len() as i32], ages));
    record(words(&[wavelengths.len() as i32], wavelengths));
    record(words(&[], &[1.0e4, 0.01]));
    record(words(&[], &[3.0e18, 0.3, 0.7]));
    record(Vec::new());

    for step in steps {
        let mut diagnostics = words(&[], &[step.base, 1.0e4, 1.1e4, 49.5]);
        diagnostics.extend(std::iter::repeat_n(0_u8, IONIC_FRACTION_BYTES));
        record(diagnostics);

        let marker = if step.lines.is_some() { 0 } else { 1 };
        record(words(&[marker], &[]));

        let continuum = wavelengths
            .iter()
            .map(|wavelength| wavelength * step.base)
            .collect::<Vec<_>>();
        record(words(&[wavelengths.len() as i32], &continuum));

        if let Some(lines) = &step.lines {
            let flat = lines
                .iter()
                .flat_map(|(luminosity, ew)| [*luminosity, *ew])
                .collect::<Vec<_>>();
            record(words(&[lines.len() as i32], &flat));
        }
    }

    bytes
}

/// Three steps, five wavelengths, a four-line block on `line_step` only.
pub fn standard_template(base: f32, line_step: usize) -> Vec<u8> {
    let steps = (0..AGES.len())
        .map(|index| StepSpec {
            base: base + index as f32,
            lines: (index == line_step).then(|| {
                (0..4)
                    .map(|line| (base + line as f32, 1.0))
                    .collect::<Vec<_>>()
            }),
        })
        .collect::<Vec<_>>();
    template_bytes(&AGES, &WAVELENGTHS, &steps)
}

fn words(ints: &[i32], floats: &[f32]) -> Vec<u8> {
    let mut payload = Vec::new();
    for value in ints {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    for value in floats {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    payload
}

/// A complete conversion input tree: catalog, two templates with companion
/// tables, templates list and configuration.
pub struct GridFixture {
    temp: TempDir,
}

impl GridFixture {
    pub fn new() -> Self {
        let fixture = Self {
            temp: TempDir::new().expect("tempdir should be created"),
        };

        fixture.write("lines.dat", CATALOG);
        fixture.write("templates/ineb_z02.ineb", standard_template(10.0, 0));
        fixture.write("templates/ineb_z0004.ineb", standard_template(20.0, 2));
        fixture.write(
            "templates/ineb_z02.4color",
            "# banner\n# log-age M_star\n0.0 1.0\n6.0 0.9\n6.3 0.8\n",
        );
        fixture.write(
            "templates/ineb_z0004.4color",
            "# log-age M_star\n0.0 2.0\n6.0 1.9\n6.3 1.8\n",
        );
        fixture.write(
            "grid.txt",
            "# file_name metallicity\ntemplates/ineb_z02.ineb 0.02\ntemplates/ineb_z0004.ineb 0.004\n",
        );
        fixture.write_config(json!({}));
        fixture
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("config.json")
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be created");
        }
        fs::write(path, content).expect("fixture file should be written");
    }

    /// Writes `config.json`; keys in `overrides` replace the defaults.
    pub fn write_config(&self, overrides: Value) {
        let mut config = json!({
            "templates_list": "grid.txt",
            "emission_lines_list": "lines.dat",
            "parameters": ["metallicity", "age"],
            "resolution_fwhm": 2.5,
            "additional quantities": [
                {"suffix": "4color", "quantities": ["M_star"]}
            ],
            "header": {"IMF": "chabrier", "stellar_library": "miles"}
        });
        if let (Some(base), Some(overrides)) = (config.as_object_mut(), overrides.as_object()) {
            for (key, value) in overrides {
                base.insert(key.clone(), value.clone());
            }
        }
        self.write(
            "config.json",
            serde_json::to_string_pretty(&config).expect("config serializes"),
        );
    }

    pub fn fits_files(&self) -> Vec<PathBuf> {
        let mut files = fs::read_dir(self.root())
            .expect("fixture root lists")
            .map(|entry| entry.expect("entry readable").path())
            .filter(|path| path.extension().is_some_and(|extension| extension == "fits"))
            .collect::<Vec<_>>();
        files.sort();
        files
    }
}

/// One HDU read back from an output file.
pub struct Hdu {
    pub cards: Vec<String>,
    pub data: Vec<u8>,
}

impl Hdu {
    pub fn value(&self, key: &str) -> Option<String> {
        let fixed = format!("{key:<8}= ");
        let hierarch = format!("HIERARCH {key} = ");
        self.cards.iter().find_map(|card| {
            let raw = card
                .strip_prefix(&fixed)
                .or_else(|| card.strip_prefix(&hierarch))?
                .trim();
            if let Some(quoted) = raw.strip_prefix('\'') {
                let end = quoted.find('\'').unwrap_or(quoted.len());
                Some(quoted[..end].trim_end().to_string())
            } else {
                Some(raw.split(" /").next().unwrap_or(raw).trim().to_string())
            }
        })
    }

    pub fn int(&self, key: &str) -> usize {
        self.value(key)
            .unwrap_or_else(|| panic!("card {key} should be present"))
            .parse()
            .unwrap_or_else(|_| panic!("card {key} should be an integer"))
    }

    pub fn column_names(&self) -> Vec<String> {
        (1..=self.int("TFIELDS"))
            .map(|index| self.value(&format!("TTYPE{index}")).expect("TTYPE present"))
            .collect()
    }

    /// Values of column `name`, row after row.
    pub fn column(&self, name: &str) -> Vec<f32> {
        let mut offset = 0;
        let mut target = None;
        for index in 1..=self.int("TFIELDS") {
            let form = self.value(&format!("TFORM{index}")).expect("TFORM present");
            let repeat = form
                .trim_end_matches('E')
                .parse::<usize>()
                .expect("repeat count");
            if self.value(&format!("TTYPE{index}")).as_deref() == Some(name) {
                target = Some((offset, repeat));
            }
            offset += repeat * 4;
        }

        let (start, repeat) = target.unwrap_or_else(|| panic!("column {name} should exist"));
        let width = self.int("NAXIS1");
        let mut values = Vec::new();
        for row in 0..self.int("NAXIS2") {
            for item in 0..repeat {
                let at = row * width + start + item * 4;
                let word: [u8; 4] = self.data[at..at + 4].try_into().expect("four bytes");
                values.push(f32::from_be_bytes(word));
            }
        }
        values
    }
}

pub fn read_fits(path: &Path) -> Vec<Hdu> {
    let bytes = fs::read(path).expect("FITS output should be readable");
    assert_eq!(bytes.len() % 2880, 0, "FITS files are whole blocks");

    let mut hdus = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        let mut cards = Vec::new();
        loop {
            let card = String::from_utf8_lossy(&bytes[position..position + 80]).to_string();
            position += 80;
            if card.trim_end() == "END" {
                break;
            }
            cards.push(card);
        }
        position = position.div_ceil(2880) * 2880;

        let mut hdu = Hdu {
            cards,
            data: Vec::new(),
        };
        if hdu.int("NAXIS") == 2 {
            let length = hdu.int("NAXIS1") * hdu.int("NAXIS2");
            hdu.data = bytes[position..position + length].to_vec();
            position += length.div_ceil(2880) * 2880;
        }
        hdus.push(hdu);
    }
    hdus
}
