//! Static presentation fixtures: field locations and crop-management events.
//!
//! The map and calendar tabs plot fixed farm data rather than anything
//! fetched from the backend.

use chrono::NaiveDate;

pub struct Field {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub crop: &'static str,
    pub area_ha: f64,
}

pub const FIELDS: [Field; 3] = [
    Field {
        name: "North Field",
        lat: -1.939826,
        lng: 30.044542,
        crop: "Wheat",
        area_ha: 2.5,
    },
    Field {
        name: "South Field",
        lat: -1.936,
        lng: 30.06,
        crop: "Maize",
        area_ha: 3.2,
    },
    Field {
        name: "East Field",
        lat: -1.95,
        lng: 30.05,
        crop: "Rice",
        area_ha: 1.8,
    },
];

pub struct CropEvent {
    pub title: &'static str,
    pub start: (i32, u32, u32),
    pub end: (i32, u32, u32),
    pub crop: &'static str,
    pub field: &'static str,
}

impl CropEvent {
    pub fn start_date(&self) -> NaiveDate {
        let (y, m, d) = self.start;
        NaiveDate::from_ymd_opt(y, m, d).expect("fixture date is valid")
    }

    pub fn end_date(&self) -> NaiveDate {
        let (y, m, d) = self.end;
        NaiveDate::from_ymd_opt(y, m, d).expect("fixture date is valid")
    }
}

pub const CROP_EVENTS: [CropEvent; 3] = [
    CropEvent {
        title: "Plant Wheat - North Field",
        start: (2023, 10, 15),
        end: (2023, 10, 15),
        crop: "Wheat",
        field: "North Field",
    },
    CropEvent {
        title: "Fertilize Maize",
        start: (2023, 10, 20),
        end: (2023, 10, 20),
        crop: "Maize",
        field: "South Field",
    },
    CropEvent {
        title: "Harvest Rice",
        start: (2023, 11, 5),
        end: (2023, 11, 7),
        crop: "Rice",
        field: "East Field",
    },
];

pub struct Rotation {
    pub field: &'static str,
    pub current: &'static str,
    pub next: &'static str,
    pub when: &'static str,
}

pub const ROTATIONS: [Rotation; 3] = [
    Rotation {
        field: "North Field",
        current: "Wheat",
        next: "Legumes",
        when: "Nov 2023",
    },
    Rotation {
        field: "South Field",
        current: "Maize",
        next: "Wheat",
        when: "Dec 2023",
    },
    Rotation {
        field: "East Field",
        current: "Rice",
        next: "Maize",
        when: "Jan 2024",
    },
];

pub struct Harvest {
    pub crop: &'static str,
    pub field: &'static str,
    pub window: &'static str,
}

pub const HARVESTS: [Harvest; 3] = [
    Harvest {
        crop: "Wheat",
        field: "North Field",
        window: "Nov 15 - Nov 20",
    },
    Harvest {
        crop: "Maize",
        field: "South Field",
        window: "Dec 1 - Dec 5",
    },
    Harvest {
        crop: "Rice",
        field: "East Field",
        window: "Jan 10 - Jan 15",
    },
];
