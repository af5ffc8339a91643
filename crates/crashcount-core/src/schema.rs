/// Hidden width of the encoder's `last_hidden_state` (distilbert-base-multilingual-cased).
pub const EMBEDDING_DIM: usize = 768;

/// Fixed token length fed to the encoder.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// Column names of the NMVCCS accident-report extract.
pub mod nmvccs {
    pub const LEVEL_0: &str = "level_0";
    pub const INDEX: &str = "index";
    pub const SCASEID: &str = "SCASEID";
    pub const SUMMARY_EN: &str = "SUMMARY_EN";
    pub const SUMMARY_GE: &str = "SUMMARY_GE";
    pub const INJSEVA: &str = "INJSEVA";
    pub const NUMTOTV: &str = "NUMTOTV";
    pub const WEATHER: [&str; 8] = [
        "WEATHER1", "WEATHER2", "WEATHER3", "WEATHER4", "WEATHER5", "WEATHER6", "WEATHER7",
        "WEATHER8",
    ];
    pub const INJSEVB: &str = "INJSEVB";

    /// Columns that can be selected as the narrative text.
    pub const SUMMARY_COLUMNS: [&str; 2] = [SUMMARY_EN, SUMMARY_GE];

    /// Numeric columns written to the derived record table, in file order.
    pub fn table_columns() -> Vec<&'static str> {
        let mut cols = vec![LEVEL_0, INDEX, SCASEID, NUMTOTV];
        cols.extend(WEATHER);
        cols.push(INJSEVA);
        cols.push(INJSEVB);
        cols
    }
}
