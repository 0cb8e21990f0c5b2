use std::collections::HashSet;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::error::{Error, Result};
use crate::fonts::{FontSet, RegisteredFont, TextMeasure, register_font};
use crate::model::{Block, Document, EmbeddedImage, ImageFormat, TextBlock};

fn set_fill(content: &mut Content, color: Option<[u8; 3]>) {
    match color {
        Some([r, g, b]) => {
            content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        }
        None => {
            content.set_fill_gray(0.0);
        }
    }
}

fn render_text(
    content: &mut Content,
    block: &TextBlock,
    fonts: &[RegisteredFont; 2],
    page_height: f32,
    ascender_ratio: f32,
) {
    if block.text.is_empty() {
        return;
    }
    let font = &fonts[usize::from(block.bold)];
    let baseline_y = page_height - block.y - block.font_size * ascender_ratio;
    set_fill(content, block.color);
    content
        .begin_text()
        .set_font(Name(font.pdf_name.as_bytes()), block.font_size)
        .next_line(block.x, baseline_y)
        .show(Str(&font.encode(&block.text)))
        .end_text();
}

fn embed_image(
    img: &EmbeddedImage,
    xobj_ref: Ref,
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
) -> Result<()> {
    match img.format {
        ImageFormat::Jpeg => {
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        ImageFormat::Png => {
            let cursor = std::io::Cursor::new(&img.data);
            let reader = image::ImageReader::with_format(
                std::io::BufReader::new(cursor),
                image::ImageFormat::Png,
            );
            let decoded = reader.decode().map_err(|e| Error::Image(e.to_string()))?;
            let rgba: image::RgbaImage = decoded.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    Ok(())
}

/// Serialize a laid-out document as PDF bytes.
pub fn render(doc: &Document, fonts: &FontSet) -> Result<Vec<u8>> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: collect used characters per weight and register both faces
    let mut used_chars: [HashSet<char>; 2] = [HashSet::new(), HashSet::new()];
    for page in &doc.pages {
        let footer_blocks = page
            .footer
            .iter()
            .flat_map(|f| [&f.page_label, &f.legend]);
        let text_blocks = page.text_blocks().chain(footer_blocks);
        for block in text_blocks {
            used_chars[usize::from(block.bold)].extend(block.text.chars());
        }
    }
    for chars in &mut used_chars {
        chars.insert(' ');
    }

    let registered = [
        register_font(&mut pdf, fonts, false, "F1".to_string(), &mut alloc, &used_chars[0]),
        register_font(&mut pdf, fonts, true, "F2".to_string(), &mut alloc, &used_chars[1]),
    ];
    let ascender_ratio = fonts.ascender_ratio();

    let t_fonts = t0.elapsed();

    // Phase 1b: embed images
    let mut image_xobjects: Vec<(String, Ref)> = Vec::with_capacity(doc.images.len());
    for (i, img) in doc.images.iter().enumerate() {
        let xobj_ref = alloc();
        embed_image(img, xobj_ref, &mut pdf, &mut alloc)?;
        image_xobjects.push((format!("Im{}", i + 1), xobj_ref));
    }

    let t_images = t0.elapsed();

    // Phase 2: one content stream per page
    let page_height = doc.page_height;
    let mut all_contents: Vec<Content> = Vec::with_capacity(doc.pages.len());
    for page in &doc.pages {
        let mut content = Content::new();
        for block in &page.blocks {
            match block {
                Block::Text(text) => {
                    render_text(&mut content, text, &registered, page_height, ascender_ratio);
                }
                Block::Rule(rule) => {
                    set_fill(&mut content, rule.color);
                    content
                        .rect(rule.x, page_height - rule.y - rule.thickness, rule.width, rule.thickness)
                        .fill_nonzero();
                }
                Block::Image(img) => {
                    let Some((name, _)) = image_xobjects.get(img.image) else {
                        log::warn!("Image block references missing image {}", img.image);
                        continue;
                    };
                    content.save_state();
                    content.transform([
                        img.width,
                        0.0,
                        0.0,
                        img.height,
                        img.x,
                        page_height - img.y - img.height,
                    ]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }
        if let Some(footer) = &page.footer {
            render_text(&mut content, &footer.page_label, &registered, page_height, ascender_ratio);
            render_text(&mut content, &footer.legend, &registered, page_height, ascender_ratio);
        }
        content.set_fill_gray(0.0);
        all_contents.push(content);
    }

    let t_layout = t0.elapsed();

    // Phase 3: allocate page and content IDs now that page count is known
    let n = all_contents.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, doc.page_width, doc.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for font in &registered {
                font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: font_embed={:.1}ms, images={:.1}ms, pages={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}
