//! Ordering of images inside a group.

use super::ImageGroup;
use crate::core::scanner::ImageFile;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

/// Key by which the members of every group are ordered.
///
/// All orders are stable, so equal keys keep their grouping order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Closest match first (ascending)
    #[default]
    Difference,
    /// Largest file first
    FileSize,
    /// Most pixels first
    Dimensions,
    /// Alphabetical by path
    Path,
}

impl SortKey {
    /// Reorder the members of one group.
    ///
    /// File size and dimensions are read on demand; missing values sort as 0.
    pub fn sort_group(&self, group: &mut ImageGroup) {
        sort_images(&mut group.images, *self);
    }

    /// Reorder the members of every group
    pub fn sort_groups(&self, groups: &mut [ImageGroup]) {
        for group in groups {
            self.sort_group(group);
        }
    }
}

fn sort_images(images: &mut [ImageFile], key: SortKey) {
    match key {
        SortKey::Difference => images.sort_by_key(|image| image.difference),
        SortKey::FileSize => {
            for image in images.iter_mut() {
                image.load_file_size();
            }
            images.sort_by_key(|image| Reverse(image.file_size.unwrap_or(0)));
        }
        SortKey::Dimensions => {
            for image in images.iter_mut() {
                image.load_dimensions();
            }
            images.sort_by_key(|image| Reverse(image.dimensions.map_or(0, |d| d.area())));
        }
        SortKey::Path => images.sort_by(|a, b| a.path.cmp(&b.path)),
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Difference => "difference",
            SortKey::FileSize => "file-size",
            SortKey::Dimensions => "dimensions",
            SortKey::Path => "path",
        };
        f.write_str(name)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "difference" => Ok(SortKey::Difference),
            "file-size" | "size" => Ok(SortKey::FileSize),
            "dimensions" | "area" => Ok(SortKey::Dimensions),
            "path" | "name" => Ok(SortKey::Path),
            other => Err(format!(
                "unknown sort key '{}' (expected difference, file-size, dimensions or path)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::Dimensions;

    fn image(name: &str, difference: u32, size: u64, width: u32) -> ImageFile {
        let mut image = ImageFile::new(format!("/photos/{}.png", name));
        image.difference = difference;
        image.file_size = Some(size);
        image.dimensions = Some(Dimensions { width, height: 10 });
        image
    }

    fn group() -> ImageGroup {
        ImageGroup::new(vec![
            image("b", 0, 100, 30),
            image("c", 4, 300, 10),
            image("a", 2, 300, 20),
        ])
    }

    fn names(group: &ImageGroup) -> Vec<&str> {
        group
            .images
            .iter()
            .map(|i| i.path.file_stem().unwrap().to_str().unwrap())
            .collect()
    }

    #[test]
    fn difference_ascending() {
        let mut g = group();
        SortKey::Difference.sort_group(&mut g);
        assert_eq!(names(&g), vec!["b", "a", "c"]);
    }

    #[test]
    fn file_size_descending_is_stable() {
        let mut g = group();
        SortKey::FileSize.sort_group(&mut g);
        // c and a tie on size and keep their order
        assert_eq!(names(&g), vec!["c", "a", "b"]);
    }

    #[test]
    fn dimensions_by_area_descending() {
        let mut g = group();
        SortKey::Dimensions.sort_group(&mut g);
        assert_eq!(names(&g), vec!["b", "a", "c"]);
    }

    #[test]
    fn path_ascending() {
        let mut g = group();
        SortKey::Path.sort_group(&mut g);
        assert_eq!(names(&g), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_metadata_sorts_last() {
        let mut unknown = ImageFile::new("/nonexistent/z.png");
        unknown.difference = 1;
        let mut g = ImageGroup::new(vec![unknown, image("a", 0, 5, 5)]);

        SortKey::FileSize.sort_group(&mut g);

        assert_eq!(names(&g), vec!["a", "z"]);
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("file-size".parse::<SortKey>().unwrap(), SortKey::FileSize);
        assert_eq!("FILE_SIZE".parse::<SortKey>().unwrap(), SortKey::FileSize);
        assert_eq!("area".parse::<SortKey>().unwrap(), SortKey::Dimensions);
        assert!("colour".parse::<SortKey>().is_err());
        assert_eq!(SortKey::FileSize.to_string().parse::<SortKey>().unwrap(), SortKey::FileSize);
    }
}
