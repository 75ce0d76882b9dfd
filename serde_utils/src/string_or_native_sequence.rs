// Index lists such as `attesting_indices` follow the same convention as scalar integers.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

#[derive(Deserialize, Serialize)]
#[serde(bound(
    deserialize = "T: Deserialize<'de> + FromStr<Err: Display>",
    serialize = "T: Serialize + Display",
))]
struct Item<T>(#[serde(with = "crate::string_or_native")] T);

pub fn deserialize<'de, I, D>(deserializer: D) -> Result<Vec<I>, D::Error>
where
    I: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct SequenceVisitor<I>(PhantomData<I>);

    impl<'de, I: Deserialize<'de> + FromStr<Err: Display>> Visitor<'de> for SequenceVisitor<I> {
        type Value = Vec<I>;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a sequence of decimal strings or unsigned integers")
        }

        fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
            let mut items = Vec::with_capacity(seq.size_hint().unwrap_or_default());

            while let Some(Item(item)) = seq.next_element()? {
                items.push(item);
            }

            Ok(items)
        }
    }

    deserializer.deserialize_seq(SequenceVisitor(PhantomData))
}

pub fn serialize<S: Serializer>(
    items: impl IntoIterator<Item = impl Serialize + Display>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(items.into_iter().map(Item))
}
