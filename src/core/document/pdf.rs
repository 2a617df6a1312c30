use image::RgbImage;
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::DocumentWriter;
use crate::core::error::{CaptureError, Result};
use crate::core::layout::PageLayout;

struct OpenPage {
    operations: Vec<Operation>,
    xobjects: Dictionary,
    image_count: usize,
}

/// PDF 输出：每张图片一个 DeviceRGB XObject，流在 finalize 时统一 Flate 压缩
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    current: Option<OpenPage>,
    page_width: f64,
    page_height: f64,
    unit_to_point: f64,
}

impl PdfWriter {
    pub fn new(layout: &PageLayout) -> Result<Self> {
        layout.validate()?;
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Ok(Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            current: None,
            page_width: layout.page_width,
            page_height: layout.page_height,
            unit_to_point: layout.unit_to_point,
        })
    }

    fn points(&self, units: f64) -> Object {
        Object::Real((units * self.unit_to_point) as f32)
    }

    // Pages where every placement failed are dropped.
    fn flush_page(&mut self) -> Result<()> {
        let Some(page) = self.current.take() else {
            return Ok(());
        };
        if page.image_count == 0 {
            debug!("dropping empty page");
            return Ok(());
        }

        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            self.points(self.page_width),
            self.points(self.page_height),
        ];
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "MediaBox" => media_box,
            "Resources" => dictionary! {
                "XObject" => page.xobjects,
            },
        });
        self.page_ids.push(page_id);
        Ok(())
    }
}

impl DocumentWriter for PdfWriter {
    fn new_page(&mut self) -> Result<()> {
        self.flush_page()?;
        self.current = Some(OpenPage {
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            image_count: 0,
        });
        Ok(())
    }

    fn place_image(
        &mut self,
        image: &RgbImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::Document("image has no pixels".into()));
        }
        if !(width > 0.0 && height > 0.0) {
            return Err(CaptureError::Document(format!(
                "invalid placement size {}x{}",
                width, height
            )));
        }
        if self.current.is_none() {
            return Err(CaptureError::Document("place_image before new_page".into()));
        }

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width()),
                "Height" => i64::from(image.height()),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            image.as_raw().clone(),
        );
        let image_id = self.doc.add_object(image_stream);

        // PDF 原点在左下角
        let operands = vec![
            self.points(width),
            Object::Integer(0),
            Object::Integer(0),
            self.points(height),
            self.points(x),
            self.points(self.page_height - y - height),
        ];

        let Some(page) = self.current.as_mut() else {
            return Err(CaptureError::Document("place_image before new_page".into()));
        };
        let name = format!("Im{}", page.image_count);
        page.operations.push(Operation::new("q", vec![]));
        page.operations.push(Operation::new("cm", operands));
        page.operations.push(Operation::new(
            "Do",
            vec![Object::Name(name.clone().into_bytes())],
        ));
        page.operations.push(Operation::new("Q", vec![]));
        page.xobjects.set(name, image_id);
        page.image_count += 1;
        Ok(())
    }

    fn finalize(mut self) -> Result<Vec<u8>> {
        self.flush_page()?;
        if self.page_ids.is_empty() {
            return Err(CaptureError::EmptyDocument);
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}
