//! Synthetic ARGO files modelled on the GDAC layouts.
//!
//! Float 5904471 is the reference float throughout: an ARVOR float in the
//! Bay of Bengal whose cycle 12 was profiled on 2020-03-14.

use netcdf_parser::Document;

use crate::builder::{DocumentBuilder, FILL};

pub const REFERENCE_FLOAT: &str = "5904471";

/// JULD of cycle 12 of the reference float: 2020-03-14T12:00:00Z.
pub const REFERENCE_JULD: f64 = 25_640.5;

/// A `<wmo>_meta.nc` document with three sensors, three parameters, two
/// launch configuration entries and two missions. Mission 2 leaves its
/// park pressure unset, so three mission configuration values are stored.
pub fn meta_document(platform_number: &str) -> Document {
    DocumentBuilder::new(format!("{platform_number}_meta.nc"))
        .dim("STRING2", 2)
        .dim("STRING4", 4)
        .dim("STRING8", 8)
        .dim("STRING16", 16)
        .dim("STRING32", 32)
        .dim("STRING64", 64)
        .dim("STRING128", 128)
        .dim("STRING256", 256)
        .dim("DATE_TIME", 14)
        .dim("N_SENSOR", 3)
        .dim("N_PARAM", 3)
        .dim("N_LAUNCH_CONFIG_PARAM", 2)
        .dim("N_CONFIG_PARAM", 2)
        .dim("N_MISSIONS", 2)
        .text("DATA_TYPE", &["STRING16"], &["Argo meta-data"])
        .text("PLATFORM_NUMBER", &["STRING8"], &[platform_number])
        .text("PROJECT_NAME", &["STRING64"], &["Argo India"])
        .text("PI_NAME", &["STRING64"], &["M RAVICHANDRAN"])
        .text("DATA_CENTRE", &["STRING2"], &["IN"])
        .text("PLATFORM_TYPE", &["STRING32"], &["ARVOR"])
        .text("PLATFORM_MAKER", &["STRING32"], &["NKE"])
        .text("FLOAT_SERIAL_NO", &["STRING32"], &["AI2600-18IN001"])
        .text("FIRMWARE_VERSION", &["STRING32"], &["5900A04"])
        .text("WMO_INST_TYPE", &["STRING4"], &["844"])
        .text("POSITIONING_SYSTEM", &["STRING8"], &["GPS"])
        .text("LAUNCH_DATE", &["DATE_TIME"], &["20190702063000"])
        .doubles("LAUNCH_LATITUDE", &[], &[12.5])
        .doubles("LAUNCH_LONGITUDE", &[], &[87.25])
        .chars("LAUNCH_QC", &[], "1")
        .text("START_DATE", &["DATE_TIME"], &["20190702070000"])
        .text("DATE_UPDATE", &["DATE_TIME"], &["20200320101500"])
        .text(
            "SENSOR",
            &["N_SENSOR", "STRING32"],
            &["CTD_PRES", "CTD_TEMP", "CTD_CNDC"],
        )
        .text(
            "SENSOR_MAKER",
            &["N_SENSOR", "STRING32"],
            &["SBE", "SBE", "SBE"],
        )
        .text(
            "SENSOR_MODEL",
            &["N_SENSOR", "STRING32"],
            &["SBE41CP", "SBE41CP", "SBE41CP"],
        )
        .text(
            "SENSOR_SERIAL_NO",
            &["N_SENSOR", "STRING16"],
            &["10293", "10293", ""],
        )
        .text("PARAMETER", &["N_PARAM", "STRING64"], &["PRES", "TEMP", "PSAL"])
        .text(
            "PARAMETER_SENSOR",
            &["N_PARAM", "STRING128"],
            &["CTD_PRES", "CTD_TEMP", "CTD_CNDC"],
        )
        .text(
            "PARAMETER_UNITS",
            &["N_PARAM", "STRING32"],
            &["decibar", "degree_Celsius", "psu"],
        )
        .text(
            "PARAMETER_ACCURACY",
            &["N_PARAM", "STRING32"],
            &["2.4", "0.002", "0.005"],
        )
        .text(
            "PREDEPLOYMENT_CALIB_EQUATION",
            &["N_PARAM", "STRING128"],
            &["none", "none", "none"],
        )
        .text(
            "LAUNCH_CONFIG_PARAMETER_NAME",
            &["N_LAUNCH_CONFIG_PARAM", "STRING128"],
            &["CONFIG_CycleTime_hours", "CONFIG_ParkPressure_dbar"],
        )
        .doubles(
            "LAUNCH_CONFIG_PARAMETER_VALUE",
            &["N_LAUNCH_CONFIG_PARAM"],
            &[240.0, 1000.0],
        )
        .text(
            "CONFIG_PARAMETER_NAME",
            &["N_CONFIG_PARAM", "STRING128"],
            &["CONFIG_CycleTime_hours", "CONFIG_ParkPressure_dbar"],
        )
        .doubles(
            "CONFIG_PARAMETER_VALUE",
            &["N_MISSIONS", "N_CONFIG_PARAM"],
            &[240.0, 1000.0, 120.0, FILL],
        )
        .ints("CONFIG_MISSION_NUMBER", &["N_MISSIONS"], &[1, 2])
        .text(
            "CONFIG_MISSION_COMMENT",
            &["N_MISSIONS", "STRING256"],
            &["Standard 10-day mission", "Short cycles after recovery"],
        )
        .build()
}

/// One profile of a profile file.
#[derive(Debug, Clone)]
pub struct ProfileFixture {
    pub platform_number: String,
    pub cycle_number: i64,
    pub data_mode: char,
    pub direction: char,
    pub juld: f64,
    pub juld_qc: char,
    pub latitude: f64,
    pub longitude: f64,
    pub position_qc: char,
    pub vertical_sampling_scheme: String,
    pub pres: Vec<f64>,
    pub pres_qc: String,
    pub temp: Vec<f64>,
    pub temp_qc: String,
    pub psal: Vec<f64>,
    pub psal_qc: String,
    pub temp_adjusted: Option<(Vec<f64>, String)>,
}

impl ProfileFixture {
    /// A real-time ascending profile with five good levels.
    pub fn new(platform_number: &str, cycle_number: i64) -> Self {
        Self {
            platform_number: platform_number.to_string(),
            cycle_number,
            data_mode: 'R',
            direction: 'A',
            juld: REFERENCE_JULD + (cycle_number - 12) as f64 * 10.0,
            juld_qc: '1',
            latitude: 12.5,
            longitude: 87.25,
            position_qc: '1',
            vertical_sampling_scheme: "Primary sampling: averaged".to_string(),
            pres: vec![5.0, 10.0, 50.0, 100.0, 200.0],
            pres_qc: "11111".to_string(),
            temp: vec![28.1, 28.0, 25.3, 20.2, 14.8],
            temp_qc: "11111".to_string(),
            psal: vec![34.1, 34.2, 34.8, 35.0, 35.1],
            psal_qc: "11111".to_string(),
            temp_adjusted: None,
        }
    }

    /// Replace the levels; all flags become good.
    pub fn with_levels(mut self, pres: &[f64], temp: &[f64], psal: &[f64]) -> Self {
        assert!(pres.len() == temp.len() && pres.len() == psal.len());
        let good = "1".repeat(pres.len());
        self.pres = pres.to_vec();
        self.temp = temp.to_vec();
        self.psal = psal.to_vec();
        self.pres_qc = good.clone();
        self.temp_qc = good.clone();
        self.psal_qc = good;
        self
    }

    pub fn with_temp_qc(mut self, qc: &str) -> Self {
        assert_eq!(qc.len(), self.temp.len());
        self.temp_qc = qc.to_string();
        self
    }

    pub fn with_psal_qc(mut self, qc: &str) -> Self {
        assert_eq!(qc.len(), self.psal.len());
        self.psal_qc = qc.to_string();
        self
    }

    /// Delayed-mode temperature adjustment.
    pub fn with_adjusted_temp(mut self, values: &[f64], qc: &str) -> Self {
        assert!(values.len() == self.temp.len() && qc.len() == self.temp.len());
        self.data_mode = 'D';
        self.temp_adjusted = Some((values.to_vec(), qc.to_string()));
        self
    }

    pub fn with_direction(mut self, direction: char) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.vertical_sampling_scheme = scheme.to_string();
        self
    }

    /// GDAC single-cycle file name, e.g. `R5904471_012.nc`.
    pub fn file_name(&self) -> String {
        let prefix = if self.data_mode == 'D' { 'D' } else { 'R' };
        let suffix = if self.direction == 'D' { "D" } else { "" };
        format!(
            "{prefix}{}_{:03}{suffix}.nc",
            self.platform_number, self.cycle_number
        )
    }

    /// This profile alone in a single-cycle file.
    pub fn document(&self) -> Document {
        profile_document(self.file_name(), std::slice::from_ref(self))
    }

    /// The BGC companion of this profile, e.g. `BR5904471_012.nc`: same
    /// header and pressures, with dissolved oxygen as the only other
    /// parameter.
    pub fn bgc_document(&self, doxy: &[f64]) -> Document {
        assert_eq!(doxy.len(), self.pres.len());
        let n_levels = self.pres.len();
        let per_prof = ["N_PROF"];
        let per_level = ["N_PROF", "N_LEVELS"];

        DocumentBuilder::new(format!("B{}", self.file_name()))
            .dim("N_PROF", 1)
            .dim("N_LEVELS", n_levels)
            .dim("STRING8", 8)
            .dim("STRING16", 16)
            .text("DATA_TYPE", &["STRING16"], &["B-Argo profile"])
            .text("PLATFORM_NUMBER", &["N_PROF", "STRING8"], &[self.platform_number.as_str()])
            .ints("CYCLE_NUMBER", &per_prof, &[self.cycle_number])
            .chars("DIRECTION", &per_prof, &self.direction.to_string())
            .chars("DATA_MODE", &per_prof, "R")
            .doubles("JULD", &per_prof, &[self.juld])
            .chars("JULD_QC", &per_prof, &self.juld_qc.to_string())
            .doubles("LATITUDE", &per_prof, &[self.latitude])
            .doubles("LONGITUDE", &per_prof, &[self.longitude])
            .chars("POSITION_QC", &per_prof, &self.position_qc.to_string())
            .doubles("PRES", &per_level, &self.pres)
            .chars("PRES_QC", &per_level, &self.pres_qc)
            .doubles("DOXY", &per_level, doxy)
            .chars("DOXY_QC", &per_level, &"1".repeat(n_levels))
            .build()
    }
}

/// A profile file holding every fixture as one `N_PROF` entry. Shorter
/// profiles are padded with fill values.
pub fn profile_document(path: impl Into<std::path::PathBuf>, profiles: &[ProfileFixture]) -> Document {
    let n_prof = profiles.len();
    let n_levels = profiles.iter().map(|p| p.pres.len()).max().unwrap_or(0);
    let per_prof = ["N_PROF"];
    let per_level = ["N_PROF", "N_LEVELS"];

    let column = |values: &dyn Fn(&ProfileFixture) -> &[f64]| -> Vec<f64> {
        profiles
            .iter()
            .flat_map(|p| {
                let v = values(p);
                (0..n_levels).map(move |i| v.get(i).copied().unwrap_or(FILL))
            })
            .collect()
    };
    let flags = |codes: &dyn Fn(&ProfileFixture) -> &str| -> String {
        profiles
            .iter()
            .map(|p| format!("{:<width$}", codes(p), width = n_levels))
            .collect()
    };
    let per_profile = |f: &dyn Fn(&ProfileFixture) -> char| -> String { profiles.iter().map(f).collect() };

    let platforms: Vec<&str> = profiles.iter().map(|p| p.platform_number.as_str()).collect();
    let schemes: Vec<&str> = profiles
        .iter()
        .map(|p| p.vertical_sampling_scheme.as_str())
        .collect();
    let cycles: Vec<i64> = profiles.iter().map(|p| p.cycle_number).collect();
    let julds: Vec<f64> = profiles.iter().map(|p| p.juld).collect();
    let latitudes: Vec<f64> = profiles.iter().map(|p| p.latitude).collect();
    let longitudes: Vec<f64> = profiles.iter().map(|p| p.longitude).collect();

    let no_adjustment: Vec<f64> = vec![FILL; n_prof * n_levels];
    let blank_flags = " ".repeat(n_prof * n_levels);

    let temp_adjusted = column(&|p| p.temp_adjusted.as_ref().map_or(&[] as &[f64], |(v, _)| v.as_slice()));
    let temp_adjusted_qc = flags(&|p| p.temp_adjusted.as_ref().map_or("", |(_, qc)| qc.as_str()));

    DocumentBuilder::new(path)
        .dim("N_PROF", n_prof)
        .dim("N_LEVELS", n_levels)
        .dim("STRING8", 8)
        .dim("STRING16", 16)
        .dim("STRING256", 256)
        .text("DATA_TYPE", &["STRING16"], &["Argo profile"])
        .text("PLATFORM_NUMBER", &["N_PROF", "STRING8"], &platforms)
        .ints("CYCLE_NUMBER", &per_prof, &cycles)
        .chars("DIRECTION", &per_prof, &per_profile(&|p| p.direction))
        .chars("DATA_MODE", &per_prof, &per_profile(&|p| p.data_mode))
        .doubles("JULD", &per_prof, &julds)
        .chars("JULD_QC", &per_prof, &per_profile(&|p| p.juld_qc))
        .doubles("LATITUDE", &per_prof, &latitudes)
        .doubles("LONGITUDE", &per_prof, &longitudes)
        .chars("POSITION_QC", &per_prof, &per_profile(&|p| p.position_qc))
        .text("VERTICAL_SAMPLING_SCHEME", &["N_PROF", "STRING256"], &schemes)
        .ints("CONFIG_MISSION_NUMBER", &per_prof, &vec![1; n_prof])
        .chars("PROFILE_PRES_QC", &per_prof, &"A".repeat(n_prof))
        .chars("PROFILE_TEMP_QC", &per_prof, &"A".repeat(n_prof))
        .chars("PROFILE_PSAL_QC", &per_prof, &"A".repeat(n_prof))
        .doubles("PRES", &per_level, &column(&|p| p.pres.as_slice()))
        .chars("PRES_QC", &per_level, &flags(&|p| p.pres_qc.as_str()))
        .doubles("PRES_ADJUSTED", &per_level, &no_adjustment)
        .chars("PRES_ADJUSTED_QC", &per_level, &blank_flags)
        .doubles("TEMP", &per_level, &column(&|p| p.temp.as_slice()))
        .chars("TEMP_QC", &per_level, &flags(&|p| p.temp_qc.as_str()))
        .doubles("TEMP_ADJUSTED", &per_level, &temp_adjusted)
        .chars("TEMP_ADJUSTED_QC", &per_level, &temp_adjusted_qc)
        .doubles("PSAL", &per_level, &column(&|p| p.psal.as_slice()))
        .chars("PSAL_QC", &per_level, &flags(&|p| p.psal_qc.as_str()))
        .doubles("PSAL_ADJUSTED", &per_level, &no_adjustment)
        .chars("PSAL_ADJUSTED_QC", &per_level, &blank_flags)
        .build()
}

/// `(institution, step, action, date)`.
pub type HistoryLine = (&'static str, &'static str, &'static str, &'static str);

/// A `<wmo>_Rtraj.nc` document.
#[derive(Debug, Clone)]
pub struct TrajectoryFixture {
    pub platform_number: String,
    /// `(juld, latitude, longitude, cycle_number)` in file order.
    pub points: Vec<(f64, f64, f64, i64)>,
    /// `(cycle_number, descent_start, ascent_end)`.
    pub cycles: Vec<(i64, f64, f64)>,
    /// Unlocated in-water samples after the fixes:
    /// `(juld, cycle_number, measurement_code, pres, temp, psal)`.
    pub in_water: Vec<(f64, i64, i64, f64, f64, f64)>,
    /// Rows of the `HISTORY_*` block.
    pub history: Vec<HistoryLine>,
}

impl TrajectoryFixture {
    /// Surface fixes for cycles 11 and 12, out of time order, plus one
    /// fix with fill values that must be dropped. Cycle 12 also carries
    /// two park-depth samples and the file has two history rows.
    pub fn new(platform_number: &str) -> Self {
        Self {
            platform_number: platform_number.to_string(),
            points: vec![
                (REFERENCE_JULD + 0.1, 12.51, 87.30, 12),
                (REFERENCE_JULD - 9.9, 12.40, 87.10, 11),
                (999_999.0, FILL, FILL, 12),
                (REFERENCE_JULD + 0.2, 12.52, 87.31, 12),
            ],
            cycles: vec![
                (11, REFERENCE_JULD - 19.5, REFERENCE_JULD - 10.0),
                (12, REFERENCE_JULD - 9.5, REFERENCE_JULD),
            ],
            in_water: vec![
                (REFERENCE_JULD - 5.0, 12, 290, 1000.4, 6.12, 34.95),
                (REFERENCE_JULD - 1.0, 12, 301, 998.7, 6.15, 34.96),
            ],
            history: vec![
                ("IF", "ARFM", "", "20200315020000"),
                ("IF", "ARGQ", "QCP$", "20200315020500"),
            ],
        }
    }

    pub fn without_history(mut self) -> Self {
        self.history.clear();
        self
    }

    pub fn file_name(&self) -> String {
        format!("{}_Rtraj.nc", self.platform_number)
    }

    pub fn document(&self) -> Document {
        let fixes = self.points.len();
        let n = fixes + self.in_water.len();
        let n_cycle = self.cycles.len();
        let n_history = self.history.len();

        let mut julds: Vec<f64> = self.points.iter().map(|p| p.0).collect();
        let mut latitudes: Vec<f64> = self.points.iter().map(|p| p.1).collect();
        let mut longitudes: Vec<f64> = self.points.iter().map(|p| p.2).collect();
        let mut cycle_numbers: Vec<i64> = self.points.iter().map(|p| p.3).collect();
        let mut codes: Vec<i64> = vec![703; fixes];
        let mut pres = vec![FILL; fixes];
        let mut temp = vec![FILL; fixes];
        let mut psal = vec![FILL; fixes];
        for &(juld, cycle, code, p, t, s) in &self.in_water {
            julds.push(juld);
            latitudes.push(FILL);
            longitudes.push(FILL);
            cycle_numbers.push(cycle);
            codes.push(code);
            pres.push(p);
            temp.push(t);
            psal.push(s);
        }
        let sample_qc = format!("{}{}", " ".repeat(fixes), "1".repeat(self.in_water.len()));

        let cycle_index: Vec<i64> = self.cycles.iter().map(|c| c.0).collect();
        let descent_start: Vec<f64> = self.cycles.iter().map(|c| c.1).collect();
        let ascent_end: Vec<f64> = self.cycles.iter().map(|c| c.2).collect();

        let history = |column: fn(&HistoryLine) -> &'static str| -> Vec<&'static str> {
            self.history.iter().map(column).collect()
        };

        let builder = DocumentBuilder::new(self.file_name())
            .dim("N_MEASUREMENT", n)
            .dim("N_CYCLE", n_cycle)
            .dim("STRING8", 8)
            .dim("STRING16", 16)
            .text("DATA_TYPE", &["STRING16"], &["Argo trajectory"])
            .text("PLATFORM_NUMBER", &["STRING8"], &[self.platform_number.as_str()])
            .doubles("JULD", &["N_MEASUREMENT"], &julds)
            .chars("JULD_QC", &["N_MEASUREMENT"], &"1".repeat(n))
            .doubles("LATITUDE", &["N_MEASUREMENT"], &latitudes)
            .doubles("LONGITUDE", &["N_MEASUREMENT"], &longitudes)
            .chars("POSITION_QC", &["N_MEASUREMENT"], &"1".repeat(n))
            .ints("CYCLE_NUMBER", &["N_MEASUREMENT"], &cycle_numbers)
            .ints("MEASUREMENT_CODE", &["N_MEASUREMENT"], &vec![703; n])
            .ints("CYCLE_NUMBER_INDEX", &["N_CYCLE"], &cycle_index)
            .chars("DATA_MODE", &["N_CYCLE"], &"R".repeat(n_cycle))
            .doubles("JULD_DESCENT_START", &["N_CYCLE"], &descent_start)
            .doubles("JULD_ASCENT_END", &["N_CYCLE"], &ascent_end)
            .chars("GROUNDED", &["N_CYCLE"], &"N".repeat(n_cycle))
            .doubles("REPRESENTATIVE_PARK_PRESSURE", &["N_CYCLE"], &vec![1000.0; n_cycle])
            .doubles("PRES", &["N_MEASUREMENT"], &pres)
            .chars("PRES_QC", &["N_MEASUREMENT"], &sample_qc)
            .doubles("TEMP", &["N_MEASUREMENT"], &temp)
            .chars("TEMP_QC", &["N_MEASUREMENT"], &sample_qc)
            .doubles("PSAL", &["N_MEASUREMENT"], &psal)
            .chars("PSAL_QC", &["N_MEASUREMENT"], &sample_qc);

        if n_history == 0 {
            return builder.build();
        }
        builder
            .dim("N_HISTORY", n_history)
            .dim("STRING4", 4)
            .dim("DATE_TIME", 14)
            .text("HISTORY_INSTITUTION", &["N_HISTORY", "STRING4"], &history(|h| h.0))
            .text("HISTORY_STEP", &["N_HISTORY", "STRING4"], &history(|h| h.1))
            .text("HISTORY_ACTION", &["N_HISTORY", "STRING4"], &history(|h| h.2))
            .text("HISTORY_DATE", &["N_HISTORY", "DATE_TIME"], &history(|h| h.3))
            .doubles("HISTORY_START_PRES", &["N_HISTORY"], &vec![FILL; n_history])
            .build()
    }
}
