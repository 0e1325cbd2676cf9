//! Dump text assembly with MiniJinja
//!
//! Every section of a dump (header, table head/tail, view stub/final,
//! footer) is a named template. Two template sets exist, `full` and
//! `compact`, and one [`Renderer`] uses exactly one of them.

use chrono::{DateTime, Utc};
use minijinja::Environment;
use mydump_core::ServerInfo;
use serde::Serialize;

use crate::literal::quote_identifier;
use crate::objects::{TableObject, ViewObject};

/// Version written into full dump headers
pub const DUMP_VERSION: &str = env!("CARGO_PKG_VERSION");

const FULL_HEADER: &str = "\
-- mydump {{ version }}
--
-- Database: {{ schema }}
-- ------------------------------------------------------
-- Server version\t{{ server_version }}

/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
/*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */;
/*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */;
/*!50503 SET NAMES utf8mb4 */;
/*!40103 SET @OLD_TIME_ZONE=@@TIME_ZONE */;
/*!40103 SET TIME_ZONE='+00:00' */;
/*!40014 SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0 */;
/*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;
/*!40101 SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO' */;
/*!40111 SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0 */;
{% if use_database %}

{% include 'use_database.sql' %}
{% endif %}
";

// Restore matches these two statements with anchored patterns, so nothing
// may share their lines.
const USE_DATABASE: &str = "\
CREATE DATABASE /*!32312 IF NOT EXISTS*/ {{ schema | identifier }} /*!40100 DEFAULT CHARACTER SET {{ charset }}{% if collation %} COLLATE {{ collation }}{% endif %} */;

USE {{ schema | identifier }};
";

const COMPACT_HEADER: &str = "\
{% if use_database %}
{% include 'use_database.sql' %}
{% endif %}
";

const FULL_FOOTER: &str = "
/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;

/*!40101 SET SQL_MODE=@OLD_SQL_MODE */;
/*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;
/*!40014 SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS */;
/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;
/*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */;
/*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */;
/*!40111 SET SQL_NOTES=@OLD_SQL_NOTES */;

-- Dump completed on {{ completed_at }}
";

const FULL_TABLE_HEAD: &str = "
--
-- Table structure for table {{ name | identifier }}
--

DROP TABLE IF EXISTS {{ name | identifier }};
/*!40101 SET @saved_cs_client     = @@character_set_client */;
/*!50503 SET character_set_client = utf8mb4 */;
{{ create_sql }};
/*!40101 SET character_set_client = @saved_cs_client */;

--
-- Dumping data for table {{ name | identifier }}
--

LOCK TABLES {{ name | identifier }} WRITE;
/*!40000 ALTER TABLE {{ name | identifier }} DISABLE KEYS */;
";

const FULL_TABLE_TAIL: &str = "\
/*!40000 ALTER TABLE {{ name | identifier }} ENABLE KEYS */;
UNLOCK TABLES;
";

const COMPACT_TABLE_HEAD: &str = "\
DROP TABLE IF EXISTS {{ name | identifier }};
{{ create_sql }};
";

const FULL_VIEW_STUB: &str = "
--
-- Temporary view structure for view {{ name | identifier }}
--

/*!50001 DROP VIEW IF EXISTS {{ name | identifier }}*/;
SET @saved_cs_client     = @@character_set_client;
/*!50503 SET character_set_client = utf8mb4 */;
{% include 'view_stub_body.sql' %}
SET character_set_client = @saved_cs_client;
";

const COMPACT_VIEW_STUB: &str = "\
/*!50001 DROP VIEW IF EXISTS {{ name | identifier }}*/;
{% include 'view_stub_body.sql' %}
";

const VIEW_STUB_BODY: &str = "\
/*!50001 CREATE VIEW {{ name | identifier }} AS SELECT
{{ stub_columns }} */;
";

const FULL_VIEW_FINAL: &str = "
--
-- Final view structure for view {{ name | identifier }}
--

/*!50001 DROP VIEW IF EXISTS {{ name | identifier }}*/;
/*!50001 SET @saved_cs_client          = @@character_set_client */;
/*!50001 SET @saved_cs_results         = @@character_set_results */;
/*!50001 SET @saved_col_connection     = @@collation_connection */;
/*!50001 SET character_set_client      = {{ charset }} */;
/*!50001 SET character_set_results     = {{ charset }} */;
/*!50001 SET collation_connection      = {{ collation }} */;
{% include 'view_definition.sql' %}
/*!50001 SET character_set_client      = @saved_cs_client */;
/*!50001 SET character_set_results     = @saved_cs_results */;
/*!50001 SET collation_connection      = @saved_col_connection */;
";

const COMPACT_VIEW_FINAL: &str = "\
/*!50001 DROP VIEW IF EXISTS {{ name | identifier }}*/;
{% include 'view_definition.sql' %}
";

const VIEW_DEFINITION: &str = "\
{% if definer %}
/*!50001 {{ head }} */
/*!50013 {{ definer }} */
/*!50001 {{ body }} */;
{% else %}
/*!50001 {{ create_sql }} */;
{% endif %}
";

/// Sections of a dump, each backed by one template per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Footer,
    TableHead,
    TableTail,
    ViewStub,
    ViewFinal,
}

impl Section {
    fn file_name(self) -> &'static str {
        match self {
            Section::Header => "header.sql",
            Section::Footer => "footer.sql",
            Section::TableHead => "table_head.sql",
            Section::TableTail => "table_tail.sql",
            Section::ViewStub => "view_stub.sql",
            Section::ViewFinal => "view_final.sql",
        }
    }
}

#[derive(Serialize)]
struct HeaderContext<'a> {
    version: &'a str,
    schema: &'a str,
    server_version: &'a str,
    charset: &'a str,
    collation: &'a str,
    use_database: bool,
}

#[derive(Serialize)]
struct FooterContext {
    completed_at: String,
}

#[derive(Serialize)]
struct TableContext<'a> {
    name: &'a str,
    create_sql: &'a str,
}

#[derive(Serialize)]
struct ViewContext<'a> {
    name: &'a str,
    stub_columns: String,
    charset: &'a str,
    collation: &'a str,
    create_sql: &'a str,
    head: &'a str,
    definer: &'a str,
    body: &'a str,
}

impl<'a> ViewContext<'a> {
    fn new(view: &'a ViewObject) -> Self {
        let stub_columns = view
            .columns
            .iter()
            .map(|c| format!(" 1 AS {}", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(",\n");
        let (head, definer, body) = match &view.definition {
            Some(d) => (d.head.as_str(), d.definer.as_str(), d.body.as_str()),
            None => ("", "", ""),
        };
        Self {
            name: &view.name,
            stub_columns,
            charset: &view.charset,
            collation: &view.collation,
            create_sql: &view.create_sql,
            head,
            definer,
            body,
        }
    }
}

/// Renders dump sections for one output variant
pub struct Renderer {
    env: Environment<'static>,
    compact: bool,
}

impl Renderer {
    /// Build a renderer for the full (`compact == false`) or compact variant
    pub fn new(compact: bool) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.add_filter("identifier", |value: String| quote_identifier(&value));

        env.add_template("use_database.sql", USE_DATABASE)?;
        env.add_template("view_stub_body.sql", VIEW_STUB_BODY)?;
        env.add_template("view_definition.sql", VIEW_DEFINITION)?;

        let sections = if compact {
            [
                (Section::Header, COMPACT_HEADER),
                (Section::Footer, ""),
                (Section::TableHead, COMPACT_TABLE_HEAD),
                (Section::TableTail, ""),
                (Section::ViewStub, COMPACT_VIEW_STUB),
                (Section::ViewFinal, COMPACT_VIEW_FINAL),
            ]
        } else {
            [
                (Section::Header, FULL_HEADER),
                (Section::Footer, FULL_FOOTER),
                (Section::TableHead, FULL_TABLE_HEAD),
                (Section::TableTail, FULL_TABLE_TAIL),
                (Section::ViewStub, FULL_VIEW_STUB),
                (Section::ViewFinal, FULL_VIEW_FINAL),
            ]
        };
        for (section, source) in sections {
            env.add_template(section.file_name(), source)?;
        }

        Ok(Self { env, compact })
    }

    pub fn is_compact(&self) -> bool {
        self.compact
    }

    fn render<T: Serialize>(&self, section: Section, context: &T) -> Result<String, minijinja::Error> {
        self.env.get_template(section.file_name())?.render(context)
    }

    /// Session settings and, when `use_database` is set, the
    /// `CREATE DATABASE` / `USE` preamble
    pub fn header(
        &self,
        schema: &str,
        server: &ServerInfo,
        use_database: bool,
    ) -> Result<String, minijinja::Error> {
        self.render(
            Section::Header,
            &HeaderContext {
                version: DUMP_VERSION,
                schema,
                server_version: &server.version,
                charset: &server.charset,
                collation: &server.collation,
                use_database,
            },
        )
    }

    pub fn footer(&self, completed_at: DateTime<Utc>) -> Result<String, minijinja::Error> {
        self.render(
            Section::Footer,
            &FooterContext {
                completed_at: completed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            },
        )
    }

    /// Everything preceding a table's `INSERT` statements
    pub fn table_head(&self, table: &TableObject, create_sql: &str) -> Result<String, minijinja::Error> {
        self.render(
            Section::TableHead,
            &TableContext {
                name: &table.name,
                create_sql,
            },
        )
    }

    pub fn table_tail(&self, table: &TableObject) -> Result<String, minijinja::Error> {
        self.render(
            Section::TableTail,
            &TableContext {
                name: &table.name,
                create_sql: "",
            },
        )
    }

    /// Placeholder view exposing the view's columns, so other views can
    /// reference it before its real definition is restored
    pub fn view_stub(&self, view: &ViewObject) -> Result<String, minijinja::Error> {
        self.render(Section::ViewStub, &ViewContext::new(view))
    }

    pub fn view_final(&self, view: &ViewObject) -> Result<String, minijinja::Error> {
        self.render(Section::ViewFinal, &ViewContext::new(view))
    }
}
