// tests/common/nycflights.rs
//
// A tiny slice of the nycflights13 tables, shared by the integration tests.
#![allow(dead_code)]

use dm::prelude::*;

pub const TABLES: [&str; 5] = ["flights", "airlines", "airports", "planes", "weather"];

fn s(v: &str) -> Value {
    Value::from(v)
}

fn n(v: i64) -> Value {
    Value::Int(v)
}

fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> Frame {
    Frame::new(columns.iter().copied(), rows).unwrap()
}

pub fn provider() -> InMemoryProvider {
    InMemoryProvider::new()
        .with_table(
            "flights",
            frame(
                &["id", "carrier", "tailnum", "origin", "dep_delay"],
                vec![
                    vec![n(1), s("UA"), s("N101"), s("EWR"), n(5)],
                    vec![n(2), s("AA"), s("N102"), s("JFK"), n(-3)],
                    vec![n(3), s("DL"), s("N103"), s("LGA"), n(12)],
                    vec![n(4), s("B6"), s("N101"), s("JFK"), n(0)],
                    vec![n(5), s("UA"), s("N103"), s("EWR"), n(30)],
                    vec![n(6), s("AA"), Value::Null, s("LGA"), n(7)],
                ],
            ),
        )
        .with_table(
            "airlines",
            frame(
                &["carrier", "name"],
                vec![
                    vec![s("AA"), s("American Airlines Inc.")],
                    vec![s("B6"), s("JetBlue Airways")],
                    vec![s("DL"), s("Delta Air Lines Inc.")],
                    vec![s("UA"), s("United Air Lines Inc.")],
                    vec![s("WN"), s("Southwest Airlines Co.")],
                ],
            ),
        )
        .with_table(
            "airports",
            frame(
                &["faa", "name"],
                vec![
                    vec![s("EWR"), s("Newark Liberty Intl")],
                    vec![s("JFK"), s("John F Kennedy Intl")],
                    vec![s("LGA"), s("La Guardia")],
                    vec![s("ATL"), s("Hartsfield Jackson Atlanta Intl")],
                ],
            ),
        )
        .with_table(
            "planes",
            frame(
                &["tailnum", "manufacturer", "year"],
                vec![
                    vec![s("N101"), s("BOEING"), n(2005)],
                    vec![s("N102"), s("BOEING"), n(2010)],
                    vec![s("N103"), s("AIRBUS"), n(2012)],
                    vec![s("N104"), s("EMBRAER"), n(2001)],
                ],
            ),
        )
        .with_table(
            "weather",
            frame(
                &["origin", "temp"],
                vec![
                    vec![s("EWR"), n(55)],
                    vec![s("JFK"), n(60)],
                    vec![s("LGA"), n(58)],
                ],
            ),
        )
}

/// Same data in an in-memory SQLite database.
pub fn sqlite_provider() -> SqliteProvider {
    let p = SqliteProvider::open_in_memory().unwrap();
    p.connection()
        .execute_batch(
            "CREATE TABLE flights (id INTEGER, carrier TEXT, tailnum TEXT, origin TEXT, dep_delay INTEGER);
             INSERT INTO flights VALUES
                (1, 'UA', 'N101', 'EWR', 5),
                (2, 'AA', 'N102', 'JFK', -3),
                (3, 'DL', 'N103', 'LGA', 12),
                (4, 'B6', 'N101', 'JFK', 0),
                (5, 'UA', 'N103', 'EWR', 30),
                (6, 'AA', NULL, 'LGA', 7);
             CREATE TABLE airlines (carrier TEXT, name TEXT);
             INSERT INTO airlines VALUES
                ('AA', 'American Airlines Inc.'),
                ('B6', 'JetBlue Airways'),
                ('DL', 'Delta Air Lines Inc.'),
                ('UA', 'United Air Lines Inc.'),
                ('WN', 'Southwest Airlines Co.');
             CREATE TABLE airports (faa TEXT, name TEXT);
             INSERT INTO airports VALUES
                ('EWR', 'Newark Liberty Intl'),
                ('JFK', 'John F Kennedy Intl'),
                ('LGA', 'La Guardia'),
                ('ATL', 'Hartsfield Jackson Atlanta Intl');
             CREATE TABLE planes (tailnum TEXT, manufacturer TEXT, year INTEGER);
             INSERT INTO planes VALUES
                ('N101', 'BOEING', 2005),
                ('N102', 'BOEING', 2010),
                ('N103', 'AIRBUS', 2012),
                ('N104', 'EMBRAER', 2001);
             CREATE TABLE weather (origin TEXT, temp INTEGER);
             INSERT INTO weather VALUES ('EWR', 55), ('JFK', 60), ('LGA', 58);",
        )
        .unwrap();
    p
}

/// Tables only, no keys.
pub fn model() -> DmModel {
    DmModel::from_provider(&provider(), &TABLES).unwrap()
}

/// Primary keys on the lookup tables, foreign keys from flights.
pub fn keyed_model() -> DmModel {
    model()
        .add_pk("airlines", "carrier", false)
        .unwrap()
        .add_pk("airports", "faa", false)
        .unwrap()
        .add_pk("planes", "tailnum", false)
        .unwrap()
        .add_fk("flights", "carrier", "airlines")
        .unwrap()
        .add_fk("flights", "tailnum", "planes")
        .unwrap()
        .add_fk("flights", "origin", "airports")
        .unwrap()
}
