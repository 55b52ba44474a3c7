/// Serialize a `TimeDelta` as an integer count of milliseconds
pub mod milliseconds {
    use chrono::TimeDelta;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms: i64 = Deserialize::deserialize(deserializer)?;

        TimeDelta::try_milliseconds(ms)
            .ok_or_else(|| D::Error::custom(format!("{} milliseconds is out of range", ms)))
    }

    pub fn serialize<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(delta.num_milliseconds())
    }
}

/// Serialize a `TimeDelta` as an integer count of seconds
pub mod seconds {
    use chrono::TimeDelta;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: i64 = Deserialize::deserialize(deserializer)?;

        TimeDelta::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("{} seconds is out of range", secs)))
    }

    pub fn serialize<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(delta.num_seconds())
    }
}
