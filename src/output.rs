//! Markdown output.
//!
//! Results are written either as one combined document (a `## <name>`
//! section per image) or as one `<image>.md` file next to each image.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::COMBINED_FILE_NAME;
use crate::runner::OcrPage;

/// Where the results go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// Every page in one file
    Combined(PathBuf),
    /// One file per image at `<image path>.md`
    PerImage,
}

impl OutputLayout {
    /// Pick the layout: an explicit output file wins, a lone directory input
    /// gets `<dir>/ocr.md`, anything else is per-image.
    pub fn resolve<P: AsRef<Path>>(out: Option<&Path>, inputs: &[P]) -> Self {
        if let Some(out) = out {
            return OutputLayout::Combined(out.to_path_buf());
        }
        match inputs {
            [only] if only.as_ref().is_dir() => {
                OutputLayout::Combined(only.as_ref().join(COMBINED_FILE_NAME))
            }
            _ => OutputLayout::PerImage,
        }
    }
}

/// Combined document text, pages in order
pub fn render_combined(pages: &[OcrPage]) -> String {
    let mut doc = String::new();
    for page in pages {
        doc.push_str(&format!("## {}\n\n", page.image.file_name()));
        doc.push_str(&page.text);
        doc.push_str("\n\n---\n\n");
    }
    doc
}

/// Write every page into one file
pub fn write_combined(out_path: &Path, pages: &[OcrPage]) -> io::Result<()> {
    fs::write(out_path, render_combined(pages))
}

/// Output path for a single image: the image path with `.md` appended
pub fn per_image_path(image: &Path) -> PathBuf {
    let mut path = image.as_os_str().to_owned();
    path.push(".md");
    PathBuf::from(path)
}

/// Write one page's text followed by a newline
pub fn write_single(out_path: &Path, text: &str) -> io::Result<()> {
    fs::write(out_path, format!("{}\n", text))
}

/// Write `pages` using `layout`, calling `on_written` after each file
pub fn write_results<F>(layout: &OutputLayout, pages: &[OcrPage], mut on_written: F) -> io::Result<()>
where
    F: FnMut(&Path),
{
    match layout {
        OutputLayout::Combined(out_path) => {
            write_combined(out_path, pages)?;
            on_written(out_path);
        }
        OutputLayout::PerImage => {
            for page in pages {
                let out_path = per_image_path(&page.image.path);
                write_single(&out_path, &page.text)?;
                on_written(&out_path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ImagePath;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn page(path: &str, text: &str) -> OcrPage {
        OcrPage::success(ImagePath::new(path), text.to_string())
    }

    #[test]
    fn test_render_combined() {
        let pages = vec![page("scans/A.png", "alpha"), page("scans/B.png", "beta")];
        assert_eq!(
            render_combined(&pages),
            "## A.png\n\nalpha\n\n---\n\n## B.png\n\nbeta\n\n---\n\n"
        );
    }

    #[test]
    fn test_per_image_path_keeps_extension() {
        assert_eq!(per_image_path(Path::new("dir/img.png")), PathBuf::from("dir/img.png.md"));
    }

    #[test]
    fn test_resolve_layout() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.png");
        fs::write(&file, b"x").unwrap();

        assert_eq!(
            OutputLayout::resolve(Some(Path::new("out.md")), &[tmp.path()]),
            OutputLayout::Combined(PathBuf::from("out.md"))
        );
        assert_eq!(
            OutputLayout::resolve(None, &[tmp.path()]),
            OutputLayout::Combined(tmp.path().join("ocr.md"))
        );
        assert_eq!(OutputLayout::resolve(None, &[&file]), OutputLayout::PerImage);
        assert_eq!(
            OutputLayout::resolve(None, &[tmp.path(), tmp.path()]),
            OutputLayout::PerImage
        );
    }

    #[test]
    fn test_write_results_per_image() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("img.png");
        let pages = vec![OcrPage::success(ImagePath::new(&image), "text".to_string())];

        let mut written = Vec::new();
        write_results(&OutputLayout::PerImage, &pages, |p| written.push(p.to_path_buf())).unwrap();

        let expected = tmp.path().join("img.png.md");
        assert_eq!(written, vec![expected.clone()]);
        assert_eq!(fs::read_to_string(expected).unwrap(), "text\n");
    }
}
