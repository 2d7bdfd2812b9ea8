#![allow(dead_code)]

use fraudscope::infrastructure::csv_source;
use polars::prelude::DataFrame;

const HEADER: &str = ",trans_date_trans_time,cc_num,merchant,category,amt,first,last,gender,street,city,state,zip,lat,long,city_pop,job,dob,trans_num,unix_time,merch_lat,merch_long,is_fraud";

const CATEGORIES: [&str; 4] = ["grocery_pos", "gas_transport", "shopping_net", "misc_net"];
const STATES: [&str; 3] = ["NY", "CA", "TX"];

/// Raw transaction export with `rows` rows and alternating labels. Fraud rows
/// are larger and happen at night.
pub fn transactions_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        let fraud = i % 2 == 1;
        let hour = if fraud { i % 6 } else { 8 + i % 12 };
        let amount = if fraud {
            300.0 + (i * 37 % 900) as f64
        } else {
            5.0 + (i * 13 % 120) as f64 + 0.25
        };
        let line = format!(
            "{idx},2019-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02},{cc},merchant_{idx},{category},{amount:.2},Jane,Doe,{gender},1 Main St,Springfield,{state},12345,{lat:.4},{long:.4},{pop},Engineer,{birth}-03-09,tx{idx},{unix},{mlat:.4},{mlong:.4},{label}",
            idx = i,
            month = 1 + i % 9,
            day = 10 + i % 18,
            hour = hour,
            minute = i % 60,
            second = (i * 7) % 60,
            cc = 4_000_000_000u64 + i as u64,
            category = CATEGORIES[i % CATEGORIES.len()],
            amount = amount,
            gender = if i % 3 == 0 { "F" } else { "M" },
            state = STATES[i % STATES.len()],
            lat = 30.0 + (i % 10) as f64 * 0.5,
            long = -90.0 + (i % 7) as f64 * 0.5,
            pop = 100 + (i * 17) % 900,
            birth = 1950 + i % 40,
            unix = 1_325_376_018 + i as u64,
            mlat = 30.2 + (i % 5) as f64 * 0.4,
            mlong = -89.8 + (i % 4) as f64 * 0.3,
            label = u8::from(fraud),
        );
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

pub fn transactions(rows: usize) -> DataFrame {
    csv_source::read_csv_bytes(transactions_csv(rows).as_bytes()).expect("synthetic CSV parses")
}

/// `LogisticRegression_YYYYMMDD_HHMMSS`, optionally with a collision suffix
pub fn is_generated_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("LogisticRegression_") else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() >= 15
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'_'
        && bytes[9..15].iter().all(u8::is_ascii_digit)
}
