/*!

This is the long-form manual for `score_ledger` and `scoretally`.

## Input files

Every period (session) of the activity is recorded in one spreadsheet. The name of
the file gives the period: with the default naming, `S3.xlsx` holds period `S3`.
The prefix (`S`) and the suffix (`.xlsx`) can be changed, see
[Configuration](#configuration).

The following formats are supported:
* `.xlsx` Excel workbooks. The first worksheet is read, unless a worksheet name is configured.
* `.csv` Comma Separated Values. The first record is the header.

The first row holds the column names. Four columns are required, and found by
their exact name:

| column            | default header     | content                                   |
|-------------------|--------------------|-------------------------------------------|
| name              | `年级专业班级姓名` | the name (and class) of the participant   |
| contact           | `手机号码`         | a phone number or any contact             |
| identifier        | `学号`             | the identifier of the participant         |
| score             | `总分`             | the score for this period                 |

Other columns are ignored. A file that lacks one of the required columns is skipped
entirely. A row is skipped when it is shorter than the required columns, when its
identifier is blank, or when its score is not a number. A blank score counts as 0.

```text
年级专业班级姓名,手机号码,学号,总分
2021 CS Anna,13800000000,2021001,50
2021 CS Bob,13800000001,2021002,30
```

Identifiers are compared as text. A numeric identifier `2021001` and the text
`2021001` are the same participant. The name and contact of a participant are the
ones seen first: later files do not change them.

## The summary

The summary has the columns name, contact, identifier, one column per period (sorted
by label, as text: `S10` comes before `S2`) and the total. There is one row per
participant, sorted by decreasing total. Participants with the same total are sorted
by identifier. A participant who missed a period has 0 for that period.

## Modes

* `update` (default): the existing summary is read back, and only the periods that
  are not already in it are read. Running the program twice on the same files leaves
  the summary unchanged.
* `regenerate`: the existing summary is ignored and the summary is rebuilt from all
  the period files.

If two files map to the same period in one run (for example when both `S1.xlsx` and
`S1.csv` are matched), the first file that is read successfully is used and the
later ones are skipped. A file that cannot be read or lacks a required column does
not count: the next file with the same period is tried.

Nothing is written when no period file is found, or when no new period was read.
The program then exits with code 3. It exits with 0 when the summary was written,
and with 1 on errors.

## Configuration

`scoretally` comes with defaults matching the score sheets exported by the registration form. A JSON
configuration file can override them:

```text
{
  "inputDirectory": "sessions",
  "filePrefix": "S",
  "fileSuffix": ".xlsx",
  "outputFile": "活动总分汇总表.xlsx",
  "worksheetName": "Sheet1",
  "sheetTitle": "总分汇总",
  "columns": {
    "name": "年级专业班级姓名",
    "contact": "手机号码",
    "identifier": "学号",
    "score": "总分",
    "total": "总分"
  }
}
```

All the keys are optional. Relative paths are resolved against the directory of the
configuration file. Command line flags take precedence over the configuration file.

The summary can also be exported in JSON (`--json-out`), and compared against a
reference JSON export (`--reference`).

 */
