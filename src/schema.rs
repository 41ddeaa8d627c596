/// Column-name constants for the trade dataset.
/// Single source of truth - shared by the loader, the exporter and the
/// Python bindings.

// ── Trade record columns ────────────────────────────────────────────────────
pub mod trade {
    pub const DATE: &str = "date";
    pub const FLOW: &str = "flow";
    pub const COUNTRY: &str = "country";
    pub const REGION: &str = "region";
    pub const CUSTOMS_UNIT: &str = "customs_unit";
    pub const PRODUCT_SECTION: &str = "product_section";
    pub const SECTION_DESCRIPTION: &str = "section_description";
    pub const PRODUCT_CODE: &str = "product_code";
    pub const PRODUCT_DESCRIPTION: &str = "product_description";
    pub const VALUE_USD: &str = "value_usd";
    pub const WEIGHT_KG: &str = "weight_kg";

    /// Export column order.
    pub const ALL: [&str; 11] = [
        DATE,
        FLOW,
        COUNTRY,
        REGION,
        CUSTOMS_UNIT,
        PRODUCT_SECTION,
        SECTION_DESCRIPTION,
        PRODUCT_CODE,
        PRODUCT_DESCRIPTION,
        VALUE_USD,
        WEIGHT_KG,
    ];

    pub const REQUIRED: [&str; 6] = [
        DATE,
        FLOW,
        COUNTRY,
        PRODUCT_SECTION,
        PRODUCT_CODE,
        VALUE_USD,
    ];

    pub const OPTIONAL: [&str; 5] = [
        REGION,
        CUSTOMS_UNIT,
        SECTION_DESCRIPTION,
        PRODUCT_DESCRIPTION,
        WEIGHT_KG,
    ];
}

// ── Flow values ─────────────────────────────────────────────────────────────
pub mod flow {
    pub const IMPORT: &str = "import";
    pub const EXPORT: &str = "export";
}

// ── Derived series columns ──────────────────────────────────────────────────
pub mod series {
    pub const PERIOD: &str = "period";
}

// ── Period granularity values ───────────────────────────────────────────────
pub mod period {
    pub const MONTH: &str = "month";
    pub const YEAR: &str = "year";
}

// ── Date column modes ───────────────────────────────────────────────────────
pub mod date_column {
    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
}

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
