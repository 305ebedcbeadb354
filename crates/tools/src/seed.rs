//! Deterministic fixture data for local development and demos.
//!
//! Every row is looked up by slug (or email) before it is inserted, so
//! running the seed twice leaves the database unchanged.

use anyhow::{anyhow, bail, Context};
use atelier_api::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use atelier_core::catalog::STATUS_PUBLISHED;
use atelier_core::roles::ROLE_ADMIN;
use atelier_core::types::DbId;
use atelier_db::models::component_version::CreateComponentVersion;
use atelier_db::models::user::{CreateUser, UpdateUser};
use atelier_db::repositories::{
    AccountRepo, CategoryRepo, ComponentRepo, ComponentVersionRepo, NewCategory, NewComponent,
    NewSubcategory, SubcategoryRepo, UserRepo,
};
use sqlx::PgPool;

struct CategoryFixture {
    name: &'static str,
    slug: &'static str,
    icon: &'static str,
    subcategories: &'static [SubcategoryFixture],
}

struct SubcategoryFixture {
    name: &'static str,
    slug: &'static str,
    components: &'static [ComponentFixture],
}

struct ComponentFixture {
    name: &'static str,
    slug: &'static str,
    tier: &'static str,
    tags: &'static [&'static str],
    /// `(framework, css_framework, label)`; the first entry becomes the default.
    versions: &'static [(&'static str, &'static str, &'static str)],
}

const FIXTURES: &[CategoryFixture] = &[
    CategoryFixture {
        name: "Forms",
        slug: "forms",
        icon: "form-input",
        subcategories: &[
            SubcategoryFixture {
                name: "Text Inputs",
                slug: "text-inputs",
                components: &[
                    ComponentFixture {
                        name: "Floating Label Input",
                        slug: "floating-label-input",
                        tier: "free",
                        tags: &["input", "form"],
                        versions: &[("react", "tailwind", "1.0.0"), ("vue", "tailwind", "1.0.0")],
                    },
                    ComponentFixture {
                        name: "OTP Input",
                        slug: "otp-input",
                        tier: "pro",
                        tags: &["input", "auth"],
                        versions: &[("react", "tailwind", "1.0.0"), ("svelte", "css", "1.0.0")],
                    },
                ],
            },
            SubcategoryFixture {
                name: "Selects",
                slug: "selects",
                components: &[ComponentFixture {
                    name: "Searchable Combobox",
                    slug: "searchable-combobox",
                    tier: "team",
                    tags: &["select", "search"],
                    versions: &[("react", "tailwind", "1.0.0")],
                }],
            },
        ],
    },
    CategoryFixture {
        name: "Navigation",
        slug: "navigation",
        icon: "compass",
        subcategories: &[SubcategoryFixture {
            name: "Navbars",
            slug: "navbars",
            components: &[
                ComponentFixture {
                    name: "Simple Navbar",
                    slug: "simple-navbar",
                    tier: "free",
                    tags: &["header", "layout"],
                    versions: &[("html", "css", "1.0.0"), ("react", "tailwind", "1.0.0")],
                },
                ComponentFixture {
                    name: "Mega Menu",
                    slug: "mega-menu",
                    tier: "pro",
                    tags: &["header", "menu"],
                    versions: &[("react", "tailwind", "1.0.0"), ("angular", "scss", "1.0.0")],
                },
            ],
        }],
    },
    CategoryFixture {
        name: "Marketing",
        slug: "marketing",
        icon: "megaphone",
        subcategories: &[SubcategoryFixture {
            name: "Pricing Tables",
            slug: "pricing-tables",
            components: &[
                ComponentFixture {
                    name: "Three Tier Pricing",
                    slug: "three-tier-pricing",
                    tier: "free",
                    tags: &["pricing"],
                    versions: &[("react", "tailwind", "1.0.0")],
                },
                ComponentFixture {
                    name: "Usage Based Pricing",
                    slug: "usage-based-pricing",
                    tier: "enterprise",
                    tags: &["pricing", "billing"],
                    versions: &[("react", "styled_components", "1.0.0"), ("vue", "scss", "1.0.0")],
                },
            ],
        }],
    },
];

/// Admin account created by the seed.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_email: String,
    pub admin_password: String,
}

/// Rows inserted by one run. All zero when the data was already present.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub subcategories: usize,
    pub components: usize,
    pub versions: usize,
    pub admin_created: bool,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Insert any missing fixture rows and ensure the admin account exists.
pub async fn run(pool: &PgPool, options: &SeedOptions) -> anyhow::Result<SeedReport> {
    validate_password_strength(&options.admin_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| anyhow!("admin password rejected: {msg}"))?;

    let mut report = SeedReport::default();

    for (position, fixture) in FIXTURES.iter().enumerate() {
        let category = match CategoryRepo::find_by_slug(pool, fixture.slug).await? {
            Some(existing) => existing,
            None => {
                report.categories += 1;
                CategoryRepo::create(
                    pool,
                    &NewCategory {
                        name: fixture.name,
                        slug: fixture.slug,
                        description: None,
                        icon: Some(fixture.icon),
                        sort_order: position as i32,
                        is_published: true,
                    },
                )
                .await
                .with_context(|| format!("creating category {}", fixture.slug))?
            }
        };

        let existing = SubcategoryRepo::list(pool, Some(category.id)).await?;
        for (position, sub) in fixture.subcategories.iter().enumerate() {
            let subcategory = match existing.iter().find(|s| s.slug == sub.slug) {
                Some(found) => found.clone(),
                None => {
                    report.subcategories += 1;
                    SubcategoryRepo::create(
                        pool,
                        &NewSubcategory {
                            category_id: category.id,
                            name: sub.name,
                            slug: sub.slug,
                            description: None,
                            sort_order: position as i32,
                            is_published: true,
                        },
                    )
                    .await
                    .with_context(|| format!("creating subcategory {}", sub.slug))?
                }
            };

            for (position, component) in sub.components.iter().enumerate() {
                if ComponentRepo::find_by_slug(pool, component.slug).await?.is_some() {
                    continue;
                }
                seed_component(pool, subcategory.id, position as i32, component, &mut report)
                    .await
                    .with_context(|| format!("creating component {}", component.slug))?;
            }
        }
    }

    report.admin_created = ensure_admin(pool, options).await?;

    tracing::info!(
        categories = report.categories,
        subcategories = report.subcategories,
        components = report.components,
        versions = report.versions,
        admin_created = report.admin_created,
        "Seed complete",
    );
    Ok(report)
}

async fn seed_component(
    pool: &PgPool,
    subcategory_id: DbId,
    sort_order: i32,
    fixture: &ComponentFixture,
    report: &mut SeedReport,
) -> anyhow::Result<()> {
    let tags: Vec<String> = fixture.tags.iter().map(|t| t.to_string()).collect();
    let component = ComponentRepo::create(
        pool,
        &NewComponent {
            subcategory_id,
            name: fixture.name,
            slug: fixture.slug,
            description: Some("Seeded example component."),
            tier: fixture.tier,
            preview_asset_id: None,
            tags: &tags,
            sort_order,
        },
    )
    .await?;
    report.components += 1;

    for &(framework, css_framework, label) in fixture.versions {
        let input = CreateComponentVersion {
            framework: framework.to_string(),
            css_framework: css_framework.to_string(),
            label: Some(label.to_string()),
            code: sample_code(fixture.name, framework),
            dependencies: Some(serde_json::json!({})),
            is_default: None,
        };
        ComponentVersionRepo::create(pool, component.id, &input)
            .await?
            .ok_or_else(|| anyhow!("component {} vanished while seeding", component.id))?;
        report.versions += 1;
    }

    ComponentRepo::set_status(pool, component.id, STATUS_PUBLISHED).await?;
    Ok(())
}

/// Create the admin user, or promote an existing account with that email.
/// Returns `true` when a new user was inserted.
async fn ensure_admin(pool: &PgPool, options: &SeedOptions) -> anyhow::Result<bool> {
    let email = options.admin_email.trim().to_lowercase();

    if let Some(user) = UserRepo::find_by_email(pool, &email).await? {
        if user.role != ROLE_ADMIN || !user.is_active {
            let update = UpdateUser {
                name: None,
                role: Some(ROLE_ADMIN.to_string()),
                is_active: Some(true),
            };
            UserRepo::update(pool, user.id, &update).await?;
            tracing::info!(user_id = user.id, "Promoted existing user to admin");
        }
        return Ok(false);
    }

    let hash = hash_password(&options.admin_password)
        .map_err(|e| anyhow!("hashing admin password: {e}"))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            email,
            name: "Atelier Admin".to_string(),
            role: Some(ROLE_ADMIN.to_string()),
            email_verified: true,
        },
    )
    .await?;
    AccountRepo::create_credential(pool, user.id, &hash).await?;

    if user.role != ROLE_ADMIN {
        bail!("user {} was created without the admin role", user.id);
    }
    Ok(true)
}

fn sample_code(name: &str, framework: &str) -> String {
    match framework {
        "vue" => format!("<template>\n  <div class=\"atelier\">{name}</div>\n</template>\n"),
        "svelte" => format!("<div class=\"atelier\">{name}</div>\n"),
        "angular" => format!(
            "@Component({{ selector: 'atelier-demo', template: '<div>{name}</div>' }})\nexport class DemoComponent {{}}\n"
        ),
        "html" => format!("<div class=\"atelier\">{name}</div>\n"),
        _ => format!(
            "export default function Demo() {{\n  return <div className=\"atelier\">{name}</div>;\n}}\n"
        ),
    }
}
