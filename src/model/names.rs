//! Bilingual object names.

/// Language slot of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Japanese, Language::English];
}

/// Japanese and English names of an object.
///
/// The Japanese slot is the first language and the one used for identity
/// checks (duplicates, knee detection, canonical names).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedName {
    pub japanese: String,
    pub english: String,
}

impl LocalizedName {
    pub fn new(japanese: impl Into<String>, english: impl Into<String>) -> Self {
        Self { japanese: japanese.into(), english: english.into() }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Japanese => &self.japanese,
            Language::English => &self.english,
        }
    }

    pub fn set(&mut self, language: Language, value: impl Into<String>) {
        match language {
            Language::Japanese => self.japanese = value.into(),
            Language::English => self.english = value.into(),
        }
    }

    /// First-language name.
    #[inline]
    pub fn first(&self) -> &str {
        &self.japanese
    }

    /// Append a suffix to both languages.
    pub fn append_suffix(&mut self, suffix: &str) {
        self.japanese.push_str(suffix);
        self.english.push_str(suffix);
    }
}

/// Store objects carrying a bilingual name.
pub trait NamedObject: super::ModelObject {
    fn name(&self) -> &LocalizedName;

    fn name_mut(&mut self) -> &mut LocalizedName;

    /// First-language name, or `"{Kind}{index}"` when it is empty.
    fn canonical_name(&self) -> String {
        let name = self.name().first();
        if name.is_empty() {
            format!("{}{}", Self::KIND, self.index().unwrap_or(0))
        } else {
            name.to_owned()
        }
    }
}

macro_rules! named_objects {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NamedObject for $ty {
                #[inline]
                fn name(&self) -> &LocalizedName {
                    &self.name
                }

                #[inline]
                fn name_mut(&mut self) -> &mut LocalizedName {
                    &mut self.name
                }
            }
        )*
    };
}

named_objects!(
    super::Material,
    super::Bone,
    super::Morph,
    super::Label,
    super::RigidBody,
    super::Joint,
    super::SoftBody,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bone, ObjectArray};

    #[test]
    fn test_canonical_name_falls_back_to_kind_and_index() {
        let mut bones = ObjectArray::new();
        bones.push(Bone::new()).unwrap();
        let mut named = Bone::new();
        named.name.japanese = "腕".into();
        bones.push(named).unwrap();
        assert_eq!(bones[0].canonical_name(), "Bone0");
        assert_eq!(bones[1].canonical_name(), "腕");
    }

    #[test]
    fn test_append_suffix() {
        let mut name = LocalizedName::new("腕", "arm");
        name.append_suffix("+");
        assert_eq!(name.get(Language::Japanese), "腕+");
        assert_eq!(name.get(Language::English), "arm+");
    }
}
