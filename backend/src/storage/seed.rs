//! Templates every fresh installation starts with.

use crate::error::ServiceResult;
use crate::render::validate;
use crate::storage::CarouselStore;
use chrono::Utc;
use common::model::template::Template;
use log::info;

struct SeedTemplate {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    role: &'static str,
    svg: &'static str,
}

const SEEDS: &[SeedTemplate] = &[
    SeedTemplate {
        id: "open-house-main",
        name: "Open House - Main Template",
        category: "open-house",
        role: "main",
        svg: r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg">
    <rect width="400" height="600" fill="#f0f8ff"/>
    <text x="200" y="100" text-anchor="middle" font-size="24" font-weight="bold" fill="#333">OPEN HOUSE</text>
    <text x="200" y="200" text-anchor="middle" font-size="18" fill="#666">{dyno.propertyaddress}</text>
    <text x="200" y="250" text-anchor="middle" font-size="16" fill="#666">Agent: {dyno.name}</text>
    <text x="200" y="300" text-anchor="middle" font-size="16" fill="#666">Phone: {dyno.phone}</text>
    <text x="200" y="350" text-anchor="middle" font-size="16" fill="#666">Date: {dyno.date}</text>
    <text x="200" y="400" text-anchor="middle" font-size="16" fill="#666">Time: {dyno.time}</text>
</svg>"##,
    },
    SeedTemplate {
        id: "open-house-photo",
        name: "Open House - Photo Template",
        category: "open-house",
        role: "photo",
        svg: r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg">
    <rect width="400" height="600" fill="#fff"/>
    <rect x="50" y="50" width="300" height="200" fill="#ddd" stroke="#999"/>
    <image id="dyno.photo" x="50" y="50" width="300" height="200" preserveAspectRatio="xMidYMid slice" href="dyno.photo"/>
    <text x="200" y="300" text-anchor="middle" font-size="20" font-weight="bold" fill="#333">OPEN HOUSE</text>
    <text x="200" y="350" text-anchor="middle" font-size="16" fill="#666">{dyno.propertyaddress}</text>
    <text x="200" y="400" text-anchor="middle" font-size="14" fill="#666">Agent: {dyno.name}</text>
    <text x="200" y="430" text-anchor="middle" font-size="14" fill="#666">Phone: {dyno.phone}</text>
    <text x="200" y="460" text-anchor="middle" font-size="14" fill="#666">{dyno.date} at {dyno.time}</text>
</svg>"##,
    },
    SeedTemplate {
        id: "sold-main",
        name: "Sold - Main Template",
        category: "sold",
        role: "main",
        svg: r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg">
    <rect width="400" height="600" fill="#ffe4e1"/>
    <text x="200" y="100" text-anchor="middle" font-size="28" font-weight="bold" fill="#d2691e">SOLD!</text>
    <text x="200" y="200" text-anchor="middle" font-size="18" fill="#666">{dyno.propertyaddress}</text>
    <text x="200" y="300" text-anchor="middle" font-size="16" fill="#666">Sold by: {dyno.name}</text>
    <text x="200" y="350" text-anchor="middle" font-size="16" fill="#666">Phone: {dyno.phone}</text>
    <text x="200" y="450" text-anchor="middle" font-size="14" fill="#666">Thank you for choosing us!</text>
</svg>"##,
    },
    SeedTemplate {
        id: "sold-photo",
        name: "Sold - Photo Template",
        category: "sold",
        role: "photo",
        svg: r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg">
    <rect width="400" height="600" fill="#fff"/>
    <rect x="50" y="50" width="300" height="200" fill="#ddd" stroke="#999"/>
    <image id="dyno.photo" x="50" y="50" width="300" height="200" preserveAspectRatio="xMidYMid slice" href="dyno.photo"/>
    <text x="200" y="300" text-anchor="middle" font-size="24" font-weight="bold" fill="#d2691e">SOLD!</text>
    <text x="200" y="350" text-anchor="middle" font-size="16" fill="#666">{dyno.propertyaddress}</text>
    <text x="200" y="400" text-anchor="middle" font-size="14" fill="#666">Sold by: {dyno.name}</text>
    <text x="200" y="430" text-anchor="middle" font-size="14" fill="#666">Phone: {dyno.phone}</text>
</svg>"##,
    },
];

/// Inserts the built-in templates when the store holds none.
pub fn seed_if_empty(store: &dyn CarouselStore) -> ServiceResult<usize> {
    if !store.list_templates()?.is_empty() {
        return Ok(0);
    }
    info!("Seeding {} built-in templates", SEEDS.len());
    let now = Utc::now();
    for seed in SEEDS {
        let check = validate::check_template(seed.svg)?;
        let (width, height) = validate::target_size((None, None), check.declared_size, "flyer")?;
        store.upsert_template(&Template {
            id: seed.id.to_string(),
            name: seed.name.to_string(),
            category: seed.category.to_string(),
            template_type: "flyer".to_string(),
            template_role: seed.role.to_string(),
            svg_content: seed.svg.to_string(),
            width,
            height,
            created_at: now,
            updated_at: now,
        })?;
    }
    Ok(SEEDS.len())
}
