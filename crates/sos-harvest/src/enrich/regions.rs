//! Composite regions derived from the primary area matches

use crate::models::AreaRef;

const KALMAR_COUNTY: [&str; 2] = ["kalmar", "kalmar län"];
const OLAND_PROVINCE: &str = "öland";

const LAPPMARKER: [&str; 5] = [
    "lycksele lappmark",
    "pite lappmark",
    "lule lappmark",
    "torne lappmark",
    "åsele lappmark",
];

fn has_name(area: &AreaRef, names: &[&str]) -> bool {
    let name = area.name.trim().to_lowercase();
    names.iter().any(|n| *n == name)
}

pub fn oland() -> AreaRef {
    AreaRef::new("Oland", "Öland")
}

pub fn kalmar_mainland() -> AreaRef {
    AreaRef::new("KalmarFastland", "Kalmar mainland")
}

pub fn lappland() -> AreaRef {
    AreaRef::new("Lappland", "Lappland")
}

/// County with Kalmar split into Öland and the mainland
pub fn county_part(county: Option<&AreaRef>, province: Option<&AreaRef>) -> Option<AreaRef> {
    let county = county?;
    if !has_name(county, &KALMAR_COUNTY) {
        return Some(county.clone());
    }
    if province.map_or(false, |p| has_name(p, &[OLAND_PROVINCE])) {
        Some(oland())
    } else {
        Some(kalmar_mainland())
    }
}

/// Province with the five lappmarker collapsed into Lappland
pub fn province_part(province: Option<&AreaRef>) -> Option<AreaRef> {
    let province = province?;
    if has_name(province, &LAPPMARKER) {
        Some(lappland())
    } else {
        Some(province.clone())
    }
}
